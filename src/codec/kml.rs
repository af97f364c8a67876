//! KML placemarks.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::{
    Coordinates, ImportFormat, SurveyError, SurveyResult, Waypoint, WaypointDraft,
    IMPORTED_POINT_NAME,
};

fn format_error(reason: impl Into<String>) -> SurveyError {
    SurveyError::format(ImportFormat::Kml, reason)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Description,
    Coordinates,
}

#[derive(Debug, Default)]
struct Placemark {
    name: Option<String>,
    description: Option<String>,
    coordinates: Option<String>,
    has_point: bool,
    point_depth: usize,
}

impl Placemark {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Description => &mut self.description,
            Field::Coordinates => &mut self.coordinates,
        }
    }

    /// `None` when there is no point or its first tuple does not parse
    fn into_draft(self) -> Option<WaypointDraft> {
        if !self.has_point {
            return None;
        }
        let raw = self.coordinates?;
        // "10, 20" is one tuple; whitespace only separates tuples
        let joined = raw.split(',').map(str::trim).collect::<Vec<_>>().join(",");
        let tuple = joined.split_whitespace().next()?;
        let mut parts = tuple.split(',');
        let lng: f64 = parts.next()?.trim().parse().ok()?;
        let lat: f64 = parts.next()?.trim().parse().ok()?;
        let coordinates = Coordinates::new(lat, lng).ok()?;

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| IMPORTED_POINT_NAME.to_string());
        Some(
            WaypointDraft::at(coordinates)
                .named(name)
                .with_notes(self.description.unwrap_or_default()),
        )
    }
}

/// Every `Placemark` holding a `Point` with parseable coordinates. The first
/// `name` and `description` inside a placemark win.
pub fn decode(text: &str) -> SurveyResult<Vec<WaypointDraft>> {
    let mut reader = Reader::from_str(text);
    let mut drafts = Vec::new();

    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<Placemark> = None;
    // Field being captured and the depth of its element
    let mut capture: Option<(Field, usize)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            format_error(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(start) => {
                depth += 1;
                saw_root = true;
                let local = start.local_name();
                match (local.as_ref(), current.as_mut()) {
                    (b"Placemark", None) => current = Some(Placemark::default()),
                    (b"Point", Some(placemark)) if !placemark.has_point => {
                        placemark.has_point = true;
                        placemark.point_depth = depth;
                    }
                    (b"name", Some(placemark)) if capture.is_none() && placemark.name.is_none() => {
                        placemark.name = Some(String::new());
                        capture = Some((Field::Name, depth));
                    }
                    (b"description", Some(placemark))
                        if capture.is_none() && placemark.description.is_none() =>
                    {
                        placemark.description = Some(String::new());
                        capture = Some((Field::Description, depth));
                    }
                    (b"coordinates", Some(placemark))
                        if capture.is_none()
                            && placemark.point_depth > 0
                            && placemark.coordinates.is_none() =>
                    {
                        placemark.coordinates = Some(String::new());
                        capture = Some((Field::Coordinates, depth));
                    }
                    _ => {}
                }
            }
            Event::Empty(_) => saw_root = true,
            Event::End(end) => {
                if matches!(capture, Some((_, at)) if at == depth) {
                    capture = None;
                }
                if let Some(placemark) = current.as_mut() {
                    if placemark.point_depth == depth {
                        // Coordinates outside the Point no longer count
                        placemark.point_depth = 0;
                    }
                }
                if end.local_name().as_ref() == b"Placemark" {
                    if let Some(draft) = current.take().and_then(Placemark::into_draft) {
                        drafts.push(draft);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(raw) => {
                if let (Some((field, _)), Some(placemark)) = (capture, current.as_mut()) {
                    let chunk = raw
                        .unescape()
                        .map_err(|e| format_error(e.to_string()))?;
                    placemark.slot(field).get_or_insert_with(String::new).push_str(&chunk);
                }
            }
            Event::CData(data) => {
                if let (Some((field, _)), Some(placemark)) = (capture, current.as_mut()) {
                    let chunk = String::from_utf8_lossy(&data).into_owned();
                    placemark.slot(field).get_or_insert_with(String::new).push_str(&chunk);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(format_error("document has no root element"));
    }
    if depth != 0 {
        return Err(format_error("unexpected end of document"));
    }
    Ok(drafts)
}

pub fn encode(waypoints: &[Waypoint]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n\
         \x20 <Document>\n\
         \x20   <name>Waypoints Export</name>\n",
    );
    for wp in waypoints {
        out.push_str("    <Placemark>\n");
        out.push_str(&format!("      <name>{}</name>\n", escape(wp.name.as_str())));
        out.push_str(&format!(
            "      <description>{}</description>\n",
            escape(wp.notes.as_str())
        ));
        out.push_str(&format!(
            "      <Point><coordinates>{},{},0</coordinates></Point>\n",
            wp.coordinates.lng, wp.coordinates.lat
        ));
        out.push_str("    </Placemark>\n");
    }
    out.push_str("  </Document>\n</kml>\n");
    out
}
