use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn input text into a [`crate::ReportSummary`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected root element <{0}>, expected <testsuite> or <testsuites>")]
    UnexpectedRoot(String),

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("invalid value {value:?} for attribute `{attribute}` on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Every way a report run can fail. None of them is recoverable.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("input file '{}' does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("cannot read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot write '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
}
