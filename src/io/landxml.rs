use super::*;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

// LandXML 1.2 TIN surfaces are written as follows:
// <LandXML version="1.2" ...>
//   <Units><Imperial|Metric areaUnit=.. linearUnit=.. volumeUnit=.. temperatureUnit=.. pressureUnit=../></Units>
//   <Surfaces>
//     <Surface name="..">
//       <Definition surfType="TIN">
//         <Pnts><P id="1">x y z</P> ...</Pnts>
//         <Faces><F>1 2 3</F> ...</Faces>
// **Note that point ids are 1-based**
// Horizontal values are written to 5 dp, elevations to 3 dp.

pub const NAMESPACE: &str = "http://www.landxml.org/schema/LandXML-1.2";
const SCHEMA_LOCATION: &str = "http://www.landxml.org/schema/LandXML-1.2 http://www.landxml.org/schema/LandXML-1.2/LandXML-1.2.xsd";
pub const VERSION: &str = "1.2";

/// Linear unit of the exported surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LinearUnit {
    Foot,
    #[default]
    Meter,
    UsSurveyFoot,
}

/// The `<Units>` block written for a [`LinearUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    /// `Metric` or `Imperial`.
    pub system: &'static str,
    pub area: &'static str,
    pub linear: &'static str,
    pub volume: &'static str,
    pub temperature: &'static str,
    pub pressure: &'static str,
}

impl LinearUnit {
    pub fn units(self) -> Units {
        const IMPERIAL: Units = Units {
            system: "Imperial",
            area: "squareFoot",
            linear: "foot",
            volume: "cubicYard",
            temperature: "fahrenheit",
            pressure: "inHG",
        };

        match self {
            LinearUnit::Meter => Units {
                system: "Metric",
                area: "squareMeter",
                linear: "meter",
                volume: "cubicMeter",
                temperature: "celsius",
                pressure: "milliBars",
            },
            LinearUnit::Foot => IMPERIAL,
            LinearUnit::UsSurveyFoot => Units {
                linear: "USSurveyFoot",
                ..IMPERIAL
            },
        }
    }

    /// Parse a LandXML `linearUnit` attribute value.
    pub fn from_attr(s: &str) -> Option<Self> {
        match s {
            "meter" => Some(LinearUnit::Meter),
            "foot" => Some(LinearUnit::Foot),
            "USSurveyFoot" => Some(LinearUnit::UsSurveyFoot),
            _ => None,
        }
    }
}

/// Document header of a surface export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    /// Surface name.
    pub name: String,
    pub unit: LinearUnit,
    /// `date` attribute (`YYYY-MM-DD`), supplied by the caller.
    pub date: Option<String>,
    /// `time` attribute (`HH:MM:SS`), supplied by the caller.
    pub time: Option<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, unit: LinearUnit) -> Self {
        Self {
            name: name.into(),
            unit,
            ..Default::default()
        }
    }
}

fn xml<E: std::fmt::Display>(e: E) -> GradeError {
    GradeError::Xml(e.to_string())
}

/// Write `mesh` as a LandXML TIN surface.
pub fn write_landxml<W: Write>(wtr: W, header: &Header, mesh: &Mesh) -> Result<()> {
    let mut w = Writer::new_with_indent(wtr, b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml)?;

    let mut root = BytesStart::new("LandXML");
    root.push_attribute(("xmlns", NAMESPACE));
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    root.push_attribute(("version", VERSION));
    if let Some(date) = &header.date {
        root.push_attribute(("date", date.as_str()));
    }
    if let Some(time) = &header.time {
        root.push_attribute(("time", time.as_str()));
    }
    w.write_event(Event::Start(root)).map_err(xml)?;

    // units
    let u = header.unit.units();
    w.write_event(Event::Start(BytesStart::new("Units")))
        .map_err(xml)?;
    let mut units = BytesStart::new(u.system);
    units.push_attribute(("areaUnit", u.area));
    units.push_attribute(("linearUnit", u.linear));
    units.push_attribute(("volumeUnit", u.volume));
    units.push_attribute(("temperatureUnit", u.temperature));
    units.push_attribute(("pressureUnit", u.pressure));
    w.write_event(Event::Empty(units)).map_err(xml)?;
    w.write_event(Event::End(BytesEnd::new("Units")))
        .map_err(xml)?;

    w.write_event(Event::Start(BytesStart::new("Surfaces")))
        .map_err(xml)?;
    let mut surface = BytesStart::new("Surface");
    surface.push_attribute(("name", header.name.as_str()));
    w.write_event(Event::Start(surface)).map_err(xml)?;
    let mut defn = BytesStart::new("Definition");
    defn.push_attribute(("surfType", "TIN"));
    w.write_event(Event::Start(defn)).map_err(xml)?;

    // points
    w.write_event(Event::Start(BytesStart::new("Pnts")))
        .map_err(xml)?;
    for (id, [x, y, z]) in mesh.vertices_with_ids() {
        let mut p = BytesStart::new("P");
        p.push_attribute(("id", id.to_string().as_str()));
        w.write_event(Event::Start(p)).map_err(xml)?;
        let txt = format!("{:.5} {:.5} {:.3}", x, y, z);
        w.write_event(Event::Text(BytesText::new(&txt)))
            .map_err(xml)?;
        w.write_event(Event::End(BytesEnd::new("P")))
            .map_err(xml)?;
    }
    w.write_event(Event::End(BytesEnd::new("Pnts")))
        .map_err(xml)?;

    // faces
    w.write_event(Event::Start(BytesStart::new("Faces")))
        .map_err(xml)?;
    for [a, b, c] in mesh.faces() {
        w.write_event(Event::Start(BytesStart::new("F")))
            .map_err(xml)?;
        let txt = format!("{} {} {}", a, b, c);
        w.write_event(Event::Text(BytesText::new(&txt)))
            .map_err(xml)?;
        w.write_event(Event::End(BytesEnd::new("F")))
            .map_err(xml)?;
    }
    w.write_event(Event::End(BytesEnd::new("Faces")))
        .map_err(xml)?;

    for end in ["Definition", "Surface", "Surfaces", "LandXML"] {
        w.write_event(Event::End(BytesEnd::new(end))).map_err(xml)?;
    }

    Ok(())
}

/// Serialize a mesh to LandXML bytes.
pub fn to_landxml(header: &Header, mesh: &Mesh) -> Vec<u8> {
    let mut buf = Vec::new();
    write_landxml(&mut buf, header, mesh)
        .expect("serialization should not fail since writing to a memory buffer");
    buf
}

/// Deserialize the first TIN surface of a LandXML document.
///
/// Point ids may be any positive integers; they are renumbered in document order.
/// A missing or unrecognised `linearUnit` falls back to [`LinearUnit::default`].
pub fn from_landxml(xml_bytes: &[u8]) -> Result<(Header, Mesh)> {
    #[derive(PartialEq)]
    enum In {
        None,
        P(u32),
        F,
    }

    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(true);

    let mut header = Header::default();
    let mut ids: HashMap<u32, u32> = HashMap::default();
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut surfaces = 0;
    let mut inside = In::None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"LandXML" => {
                    header.date = attr(e, b"date")?;
                    header.time = attr(e, b"time")?;
                }
                b"Metric" | b"Imperial" => {
                    if let Some(u) = attr(e, b"linearUnit")?.and_then(|u| LinearUnit::from_attr(&u))
                    {
                        header.unit = u;
                    }
                }
                b"Surface" => {
                    surfaces += 1;
                    if surfaces == 1 {
                        header.name = attr(e, b"name")?.unwrap_or_default();
                    }
                }
                b"P" if surfaces == 1 => {
                    let id = attr(e, b"id")?
                        .ok_or_else(|| GradeError::Parse("point without an id".into()))?;
                    let id = id.trim().parse::<u32>().map_err(|e| {
                        GradeError::Parse(format!("invalid point id '{}': {}", id, e))
                    })?;
                    inside = In::P(id);
                }
                b"F" if surfaces == 1 => inside = In::F,
                _ => (),
            },
            Event::Text(t) => {
                let txt = std::str::from_utf8(&t).map_err(xml)?;
                match inside {
                    In::P(id) => {
                        let p = parse_triple::<f64>(txt)?;
                        vertices.push(p);
                        ids.insert(id, vertices.len() as u32);
                    }
                    In::F => {
                        let f = parse_triple::<u32>(txt)?;
                        let f = f.map(|i| ids.get(&i).copied().unwrap_or(0));
                        faces.push(f);
                    }
                    In::None => (),
                }
            }
            Event::End(_) => inside = In::None,
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    if surfaces == 0 {
        return Err(GradeError::Parse("document contains no Surface".into()));
    }

    log::debug!(
        "read surface '{}' with {} points and {} faces",
        header.name,
        vertices.len(),
        faces.len()
    );

    let mesh = Mesh::from_raw(vertices, faces)?;
    Ok((header, mesh))
}

fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for a in e.attributes().flatten() {
        if a.key.local_name().as_ref() == name {
            let v = a.unescape_value().map_err(xml)?;
            return Ok(Some(v.into_owned()));
        }
    }
    Ok(None)
}

fn parse_triple<T>(s: &str) -> Result<[T; 3]>
where
    T: std::str::FromStr + Copy + Default,
    T::Err: std::fmt::Display,
{
    let mut out = [T::default(); 3];
    let mut it = s.split_whitespace();
    for x in out.iter_mut() {
        let v = it
            .next()
            .ok_or_else(|| GradeError::Parse(format!("expecting 3 values: '{}'", s)))?;
        *x = v
            .parse()
            .map_err(|e| GradeError::Parse(format!("invalid value '{}': {}", v, e)))?;
    }
    if it.next().is_some() {
        return Err(GradeError::Parse(format!("expecting 3 values: '{}'", s)));
    }
    Ok(out)
}
