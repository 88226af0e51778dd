//! Typed feature-type documents for GeoServer's REST catalog.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureTypeError {
    #[error("{field_type} is not a valid type for field {field}")]
    InvalidAttributeType { field: String, field_type: String },

    #[error("{0} is not a supported geometry type")]
    InvalidGeometry(String),

    #[error("attributes must be a JSON object of field name to type: {0}")]
    InvalidAttributes(String),
}

/// Geometry of the layer's `the_geom` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn binding(self) -> &'static str {
        match self {
            GeometryType::Point => "com.vividsolutions.jts.geom.Point",
            GeometryType::LineString => "com.vividsolutions.jts.geom.LineString",
            GeometryType::Polygon => "com.vividsolutions.jts.geom.Polygon",
        }
    }
}

impl FromStr for GeometryType {
    type Err = FeatureTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" => Ok(GeometryType::Point),
            "linestring" => Ok(GeometryType::LineString),
            "polygon" => Ok(GeometryType::Polygon),
            _ => Err(FeatureTypeError::InvalidGeometry(s.to_string())),
        }
    }
}

/// The closed set of user attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Float,
    Date,
    String,
    Integer,
}

impl AttributeType {
    pub fn binding(self) -> &'static str {
        match self {
            AttributeType::Float => "java.lang.Float",
            AttributeType::Date => "java.util.Date",
            AttributeType::String => "java.lang.String",
            AttributeType::Integer => "java.lang.Integer",
        }
    }

    fn parse(field: &str, field_type: &str) -> Result<Self, FeatureTypeError> {
        match field_type.to_ascii_lowercase().as_str() {
            "float" => Ok(AttributeType::Float),
            "date" => Ok(AttributeType::Date),
            "string" => Ok(AttributeType::String),
            "integer" => Ok(AttributeType::Integer),
            _ => Err(FeatureTypeError::InvalidAttributeType {
                field: field.to_string(),
                field_type: field_type.to_string(),
            }),
        }
    }
}

/// Parse `{"name": "string", "count": "integer"}` into typed attributes.
///
/// Fields come back sorted by name.
pub fn attributes_from_json(json: &str) -> Result<Vec<(String, AttributeType)>, FeatureTypeError> {
    let fields: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| FeatureTypeError::InvalidAttributes(e.to_string()))?;

    let mut attributes = fields
        .iter()
        .map(|(name, value)| {
            let field_type = value.as_str().ok_or_else(|| {
                FeatureTypeError::InvalidAttributes(format!("type of {} must be a string", name))
            })?;
            Ok((name.clone(), AttributeType::parse(name, field_type)?))
        })
        .collect::<Result<Vec<_>, FeatureTypeError>>()?;
    attributes.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(attributes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub binding: &'static str,
    pub nillable: bool,
}

/// An empty EPSG:4326 feature type ready to be posted to a datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureType {
    pub name: String,
    pub native_name: String,
    pub title: String,
    attributes: Vec<Attribute>,
}

impl FeatureType {
    pub fn new(name: impl Into<String>, title: impl Into<String>, geometry: GeometryType) -> Self {
        let name = name.into();
        Self {
            native_name: name.clone(),
            name,
            title: title.into(),
            attributes: vec![Attribute {
                name: "the_geom".to_string(),
                binding: geometry.binding(),
                nillable: false,
            }],
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            binding: attribute_type.binding(),
            nillable: true,
        });
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<featureType><name>{}</name><nativeName>{}</nativeName><title>{}</title>\
             <srs>EPSG:4326</srs>\
             <latLonBoundingBox><minx>-180</minx><maxx>180</maxx><miny>-90</miny><maxy>90</maxy>\
             <crs>EPSG:4326</crs></latLonBoundingBox><attributes>",
            Escaped(&self.name),
            Escaped(&self.native_name),
            Escaped(&self.title),
        )?;
        for attribute in &self.attributes {
            write!(
                f,
                "<attribute><name>{}</name><binding>{}</binding><nillable>{}</nillable></attribute>",
                Escaped(&attribute.name),
                attribute.binding,
                attribute.nillable,
            )?;
        }
        f.write_str("</attributes></featureType>")
    }
}

/// XML text escaping.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                c => fmt::Write::write_char(f, c)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_comes_first_and_is_required() {
        let ft = FeatureType::new("roads", "Roads", GeometryType::LineString)
            .with_attribute("lanes", AttributeType::Integer);

        assert_eq!(
            ft.attributes(),
            &[
                Attribute {
                    name: "the_geom".into(),
                    binding: "com.vividsolutions.jts.geom.LineString",
                    nillable: false,
                },
                Attribute {
                    name: "lanes".into(),
                    binding: "java.lang.Integer",
                    nillable: true,
                },
            ]
        );
    }

    #[test]
    fn test_xml_document() {
        let xml = FeatureType::new("wells", "Wells", GeometryType::Point)
            .with_attribute("depth", AttributeType::Float)
            .to_xml();

        assert_eq!(
            xml,
            "<featureType><name>wells</name><nativeName>wells</nativeName><title>Wells</title>\
             <srs>EPSG:4326</srs>\
             <latLonBoundingBox><minx>-180</minx><maxx>180</maxx><miny>-90</miny><maxy>90</maxy>\
             <crs>EPSG:4326</crs></latLonBoundingBox>\
             <attributes>\
             <attribute><name>the_geom</name><binding>com.vividsolutions.jts.geom.Point</binding><nillable>false</nillable></attribute>\
             <attribute><name>depth</name><binding>java.lang.Float</binding><nillable>true</nillable></attribute>\
             </attributes></featureType>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = FeatureType::new("parks", "Parks & <Gardens>", GeometryType::Polygon).to_xml();
        assert!(xml.contains("<title>Parks &amp; &lt;Gardens&gt;</title>"));
    }

    #[test]
    fn test_attribute_types_from_json() {
        let attrs = attributes_from_json(
            r#"{"field_str": "string", "field_int": "Integer", "field_date": "date", "field_float": "FLOAT"}"#,
        )
        .unwrap();
        assert_eq!(
            attrs,
            vec![
                ("field_date".to_string(), AttributeType::Date),
                ("field_float".to_string(), AttributeType::Float),
                ("field_int".to_string(), AttributeType::Integer),
                ("field_str".to_string(), AttributeType::String),
            ]
        );
    }

    #[test]
    fn test_unknown_attribute_type_is_rejected() {
        let err = attributes_from_json(r#"{"geom2": "geometry"}"#).unwrap_err();
        assert_eq!(
            err,
            FeatureTypeError::InvalidAttributeType {
                field: "geom2".into(),
                field_type: "geometry".into(),
            }
        );
        assert_eq!(err.to_string(), "geometry is not a valid type for field geom2");
    }

    #[test]
    fn test_geometry_parsing() {
        assert_eq!("Polygon".parse::<GeometryType>().unwrap(), GeometryType::Polygon);
        assert_eq!("linestring".parse::<GeometryType>().unwrap(), GeometryType::LineString);
        assert!("Circle".parse::<GeometryType>().is_err());
    }
}
