//! JUnit XML reader.
//!
//! The input is first read into a small element tree, then the tree is walked
//! into a [`ReportSummary`]. Missing optional attributes are filled with their
//! defaults here so nothing downstream has to care about absent values.

use crate::error::{ParseError, ReportError};
use crate::model::{ReportSummary, Status, TestCase, TestSuite};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

const TAG_SUITES: &str = "testsuites";
const TAG_SUITE: &str = "testsuite";
const TAG_CASE: &str = "testcase";
const TAG_FAILURE: &str = "failure";
const TAG_ERROR: &str = "error";
const TAG_SKIPPED: &str = "skipped";

const UNKNOWN: &str = "Unknown";
const NO_MESSAGE: &str = "No message";
const SKIPPED_MESSAGE: &str = "Test skipped";
const NO_DETAILS: &str = "No details";

/// Marker children in the order they decide a case's status.
const STATUS_MARKERS: [(&str, Status); 3] = [
    (TAG_FAILURE, Status::Failed),
    (TAG_ERROR, Status::Errored),
    (TAG_SKIPPED, Status::Skipped),
];

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    /// Text before the first child element.
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element, quick_xml::Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        ..Element::default()
    })
}

/// XML 1.0 `Char`: tab, newline, carriage return, and everything from U+0020
/// except U+FFFE and U+FFFF. Surrogates cannot occur in a `str`.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= '\u{20}' && c != '\u{fffe}' && c != '\u{ffff}')
}

fn check_chars(text: &str, context: &str) -> Result<(), ParseError> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ParseError::Malformed(format!(
            "invalid character U+{:04X} in {context}",
            c as u32
        ))),
        None => Ok(()),
    }
}

fn check_attr_chars(el: &Element) -> Result<(), ParseError> {
    for (key, value) in &el.attrs {
        check_chars(value, &format!("attribute `{key}` of <{}>", el.name))?;
    }
    Ok(())
}

/// CRLF and lone CR become LF, as an XML processor's end-of-line handling requires.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn ensure_no_root_yet(stack: &[Element], root: &Option<Element>) -> Result<(), ParseError> {
    if stack.is_empty() && root.is_some() {
        return Err(ParseError::Malformed(
            "content after the root element".to_string(),
        ));
    }
    Ok(())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_some() {
                return Err(ParseError::Malformed(
                    "content after the root element".to_string(),
                ));
            }
            *root = Some(el);
        }
    }
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), ParseError> {
    check_chars(text, "text content")?;
    match stack.last_mut() {
        Some(el) => {
            if el.children.is_empty() {
                el.text.push_str(&normalize_newlines(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ParseError::Malformed(
            "text outside the root element".to_string(),
        )),
    }
}

fn xml_error(reader: &Reader<&[u8]>, source: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        position: reader.buffer_position(),
        source,
    }
}

fn read_tree(xml: &str) -> Result<Element, ParseError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(&reader, e))?;
        match event {
            Event::Start(start) => {
                ensure_no_root_yet(&stack, &root)?;
                let el = element_from_start(&start).map_err(|e| xml_error(&reader, e))?;
                check_attr_chars(&el)?;
                stack.push(el);
            }
            Event::Empty(start) => {
                ensure_no_root_yet(&stack, &root)?;
                let el = element_from_start(&start).map_err(|e| xml_error(&reader, e))?;
                check_attr_chars(&el)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| {
                    ParseError::Malformed("closing tag without an opening tag".to_string())
                })?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_error(&reader, e))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Malformed(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or(ParseError::MissingRoot)
}

fn invalid_attr(el: &Element, attribute: &str, value: &str) -> ParseError {
    ParseError::InvalidAttribute {
        element: el.name.clone(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn count_attr(el: &Element, attribute: &str) -> Result<Option<u32>, ParseError> {
    el.attr(attribute)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| invalid_attr(el, attribute, raw))
        })
        .transpose()
}

fn time_attr(el: &Element) -> Result<f64, ParseError> {
    let Some(raw) = el.attr("time") else {
        return Ok(0.0);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(invalid_attr(el, "time", raw)),
    }
}

fn text_attr(el: &Element, attribute: &str, default: &str) -> String {
    el.attr(attribute).unwrap_or(default).to_string()
}

/// First marker child in priority order decides the status.
fn classify(case: &Element) -> (Status, Option<&Element>) {
    STATUS_MARKERS
        .iter()
        .find_map(|(tag, status)| case.child(tag).map(|marker| (*status, Some(marker))))
        .unwrap_or((Status::Passed, None))
}

fn parse_case(el: &Element) -> Result<TestCase, ParseError> {
    let (status, marker) = classify(el);
    let (message, details) = match (status, marker) {
        (Status::Failed | Status::Errored, Some(m)) => (
            Some(text_attr(m, "message", NO_MESSAGE)),
            Some(if m.text.is_empty() {
                NO_DETAILS.to_string()
            } else {
                m.text.clone()
            }),
        ),
        (Status::Skipped, Some(m)) => (Some(text_attr(m, "message", SKIPPED_MESSAGE)), None),
        _ => (None, None),
    };

    Ok(TestCase {
        name: text_attr(el, "name", UNKNOWN),
        classname: text_attr(el, "classname", UNKNOWN),
        time: time_attr(el)?,
        status,
        message,
        details,
    })
}

fn parse_suite(el: &Element) -> Result<TestSuite, ParseError> {
    let cases = el
        .children_named(TAG_CASE)
        .map(parse_case)
        .collect::<Result<Vec<_>, _>>()?;
    let count = |status: Status| cases.iter().filter(|c| c.status == status).count() as u32;

    let tests = count_attr(el, "tests")?.unwrap_or(cases.len() as u32);
    let failures = count_attr(el, "failures")?.unwrap_or_else(|| count(Status::Failed));
    let errors = count_attr(el, "errors")?.unwrap_or_else(|| count(Status::Errored));
    let skipped = count_attr(el, "skipped")?.unwrap_or_else(|| count(Status::Skipped));
    let time = time_attr(el)?;

    Ok(TestSuite {
        name: text_attr(el, "name", UNKNOWN),
        tests,
        failures,
        errors,
        skipped,
        time,
        cases,
    })
}

/// Parses a JUnit document whose root is `<testsuite>` or `<testsuites>`.
pub fn parse_str(xml: &str) -> Result<ReportSummary, ParseError> {
    let root = read_tree(xml)?;
    let suites = match root.name.as_str() {
        TAG_SUITE => vec![parse_suite(&root)?],
        TAG_SUITES => root
            .children_named(TAG_SUITE)
            .map(parse_suite)
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(ParseError::UnexpectedRoot(other.to_string())),
    };
    debug!("parsed {} suite(s) from <{}>", suites.len(), root.name);
    Ok(ReportSummary { suites })
}

pub fn parse_file(path: &Path) -> Result<ReportSummary, ReportError> {
    let xml = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&xml).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
