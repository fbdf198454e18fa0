use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{DemError, Result};
use crate::model::{CoordinatePair, Coverage, GridEnvelope, StartPoint};

const GML_NAMESPACE_PREFIX: &[u8] = b"http://www.opengis.net/gml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    LowerCorner,
    UpperCorner,
    GridHigh,
    StartPoint,
    TupleList,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::LowerCorner => "lowerCorner",
            Field::UpperCorner => "upperCorner",
            Field::GridHigh => "GridEnvelope/high",
            Field::StartPoint => "startPoint",
            Field::TupleList => "tupleList",
        }
    }
}

#[derive(Default)]
struct RawFields {
    lower_corner: Option<String>,
    upper_corner: Option<String>,
    grid_high: Option<String>,
    start_point: Option<String>,
    tuple_list: Option<String>,
}

impl RawFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::LowerCorner => &mut self.lower_corner,
            Field::UpperCorner => &mut self.upper_corner,
            Field::GridHigh => &mut self.grid_high,
            Field::StartPoint => &mut self.start_point,
            Field::TupleList => &mut self.tuple_list,
        }
    }

    fn store(&mut self, field: Field, text: String) -> Result<()> {
        let slot = self.slot(field);
        if slot.is_some() {
            return Err(DemError::malformed(format!(
                "{} appears more than once",
                field.name()
            )));
        }
        *slot = Some(text);
        Ok(())
    }
}

fn require(value: Option<String>, field: Field) -> Result<String> {
    value.ok_or_else(|| DemError::malformed(format!("missing {}", field.name())))
}

fn is_gml(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if uri.starts_with(GML_NAMESPACE_PREFIX))
}

fn parse_index_pair(text: &str, field: Field) -> Result<(usize, usize)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(DemError::malformed(format!(
            "{} must hold exactly 2 values, found {}",
            field.name(),
            tokens.len()
        )));
    }
    let parse = |token: &str| {
        token
            .parse::<usize>()
            .map_err(|_| DemError::numeric(field.name(), token))
    };
    Ok((parse(tokens[0])?, parse(tokens[1])?))
}

/// Reads a GML coverage document and extracts the grid description.
///
/// `lowerCorner`, `upperCorner`, `GridEnvelope/high`, `startPoint` and
/// `tupleList` must each appear exactly once in a GML namespace. The tuple
/// list is returned verbatim.
pub fn parse_coverage<R: BufRead>(source: R) -> Result<Coverage> {
    let mut reader = NsReader::from_reader(source);
    reader.config_mut().trim_text(false);

    let mut fields = RawFields::default();
    let mut buf = Vec::new();
    let mut envelope_depth = 0usize;
    let mut capture: Option<(Field, String)> = None;

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ns, Event::Start(e)) if is_gml(&ns) => {
                let field = match e.local_name().as_ref() {
                    b"GridEnvelope" => {
                        envelope_depth += 1;
                        None
                    }
                    b"high" if envelope_depth > 0 => Some(Field::GridHigh),
                    b"lowerCorner" => Some(Field::LowerCorner),
                    b"upperCorner" => Some(Field::UpperCorner),
                    b"startPoint" => Some(Field::StartPoint),
                    b"tupleList" => Some(Field::TupleList),
                    _ => None,
                };
                if let Some(field) = field {
                    capture = Some((field, String::new()));
                }
            }
            (ns, Event::Empty(e)) => {
                // <gml:tupleList/> is a present but empty stream
                if is_gml(&ns) && e.local_name().as_ref() == b"tupleList" {
                    fields.store(Field::TupleList, String::new())?;
                }
            }
            (_, Event::Text(e)) => {
                if let Some((_, text)) = capture.as_mut() {
                    let unescaped = e.unescape().map_err(quick_xml::Error::from)?;
                    text.push_str(&unescaped);
                }
            }
            (_, Event::CData(e)) => {
                if let Some((_, text)) = capture.as_mut() {
                    let decoded = std::str::from_utf8(&e).map_err(|err| {
                        DemError::malformed(format!("CDATA is not valid UTF-8: {}", err))
                    })?;
                    text.push_str(decoded);
                }
            }
            (ns, Event::End(e)) => {
                if is_gml(&ns) {
                    if e.local_name().as_ref() == b"GridEnvelope" {
                        envelope_depth = envelope_depth.saturating_sub(1);
                    } else if let Some((field, text)) = capture.take() {
                        fields.store(field, text)?;
                    }
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some((field, _)) = capture {
        return Err(DemError::malformed(format!(
            "unterminated {} element",
            field.name()
        )));
    }

    let lower_corner = CoordinatePair::parse(
        &require(fields.lower_corner, Field::LowerCorner)?,
        Field::LowerCorner.name(),
    )?;
    let upper_corner = CoordinatePair::parse(
        &require(fields.upper_corner, Field::UpperCorner)?,
        Field::UpperCorner.name(),
    )?;
    let (high_col, high_row) =
        parse_index_pair(&require(fields.grid_high, Field::GridHigh)?, Field::GridHigh)?;
    let (start_col, start_row) = parse_index_pair(
        &require(fields.start_point, Field::StartPoint)?,
        Field::StartPoint,
    )?;
    let tuple_list = require(fields.tuple_list, Field::TupleList)?;

    Ok(Coverage {
        lower_corner,
        upper_corner,
        envelope: GridEnvelope { high_col, high_row },
        start_point: StartPoint {
            col: start_col,
            row: start_row,
        },
        tuple_list,
    })
}

pub fn parse_coverage_str(xml: &str) -> Result<Coverage> {
    parse_coverage(xml.as_bytes())
}
