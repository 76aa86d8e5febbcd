#[cfg(test)]
pub mod test {
    use std::path::PathBuf;

    use chrono::TimeDelta;

    use crate::error::ConftreeError;
    use crate::node::ConfigNode;
    use crate::schema::{EnumDescriptor, Field, RecordDescriptor, TypeDescriptor};
    use crate::shape::{Shape, expect_enum, expect_record};
    use crate::value::{EnumValue, Record, Value};

    // -- Server: defaults, an optional field and a dash alias --------------------

    fn default_tags() -> ConfigNode {
        ConfigNode::sequence(["default"])
    }

    pub fn server_schema() -> TypeDescriptor {
        RecordDescriptor::new("Server")
            .field(Field::new("host", TypeDescriptor::string()).default("localhost"))
            .with("port", TypeDescriptor::int())
            .with(
                "max_connections",
                TypeDescriptor::optional(TypeDescriptor::int()),
            )
            .field(
                Field::new("tags", TypeDescriptor::list(TypeDescriptor::string()))
                    .default_with(default_tags),
            )
            .into()
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Server {
        pub host: String,
        pub port: u16,
        pub max_connections: Option<u32>,
        pub tags: Vec<String>,
    }

    impl Shape for Server {
        fn descriptor() -> TypeDescriptor {
            server_schema()
        }

        fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
            let mut record = expect_record(value, "Server", path)?;
            Ok(Server {
                host: record.extract("host", path)?,
                port: record.extract("port", path)?,
                max_connections: record.extract("max_connections", path)?,
                tags: record.extract("tags", path)?,
            })
        }

        fn to_value(&self) -> Value {
            Record::new("Server")
                .with("host", self.host.to_value())
                .with("port", self.port.to_value())
                .with("max_connections", self.max_connections.to_value())
                .with("tags", self.tags.to_value())
                .into()
        }
    }

    // -- Input: a closed polymorphic family --------------------------------------

    pub fn input_schema() -> TypeDescriptor {
        TypeDescriptor::polymorphic(
            "Input",
            vec![
                RecordDescriptor::new("FileInput")
                    .path("inputs")
                    .with("path", TypeDescriptor::path()),
                RecordDescriptor::new("HttpInput")
                    .path("inputs")
                    .with("url", TypeDescriptor::string())
                    .field(Field::new("timeout", TypeDescriptor::duration()).default("PT30S")),
            ],
        )
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Input {
        File { path: PathBuf },
        Http { url: String, timeout: TimeDelta },
    }

    impl Shape for Input {
        fn descriptor() -> TypeDescriptor {
            input_schema()
        }

        fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
            let variant = value.as_record().map(|r| r.name.clone()).unwrap_or_default();
            match variant.as_str() {
                "FileInput" => {
                    let mut record = expect_record(value, "FileInput", path)?;
                    Ok(Input::File {
                        path: record.extract("path", path)?,
                    })
                }
                _ => {
                    let mut record = expect_record(value, "HttpInput", path)?;
                    Ok(Input::Http {
                        url: record.extract("url", path)?,
                        timeout: record.extract("timeout", path)?,
                    })
                }
            }
        }

        fn to_value(&self) -> Value {
            match self {
                Input::File { path } => Record::new("FileInput")
                    .variant("inputs::FileInput")
                    .with("path", path.to_value()),
                Input::Http { url, timeout } => Record::new("HttpInput")
                    .variant("inputs::HttpInput")
                    .with("url", url.to_value())
                    .with("timeout", timeout.to_value()),
            }
            .into()
        }
    }

    /// Two variants with identical fields; only `_type` can tell them apart.
    pub fn ambiguous_schema() -> TypeDescriptor {
        TypeDescriptor::polymorphic(
            "Base",
            vec![
                RecordDescriptor::new("VariantTwo")
                    .path("variants")
                    .with("bar", TypeDescriptor::string()),
                RecordDescriptor::new("VariantOne")
                    .path("variants")
                    .with("bar", TypeDescriptor::string()),
            ],
        )
    }

    // -- Color: a plain enumeration ----------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Color {
        Red,
        Green,
        Blue,
    }

    impl Shape for Color {
        fn descriptor() -> TypeDescriptor {
            EnumDescriptor::new("Color", &["Red", "Green", "Blue"]).into()
        }

        fn from_value(value: Value, path: &str) -> Result<Self, ConftreeError> {
            let EnumValue { member, .. } = expect_enum(value, path)?;
            match member.as_str() {
                "Red" => Ok(Color::Red),
                "Green" => Ok(Color::Green),
                "Blue" => Ok(Color::Blue),
                other => Err(ConftreeError::mismatch(path, "Color", other)),
            }
        }

        fn to_value(&self) -> Value {
            let (member, ordinal) = match self {
                Color::Red => ("Red", 1),
                Color::Green => ("Green", 2),
                Color::Blue => ("Blue", 3),
            };
            Value::Enum(EnumValue {
                member: member.into(),
                ordinal,
            })
        }
    }

    #[test]
    fn server_schema_matches_shape() {
        let value = crate::decode::decode(&ConfigNode::from_pairs([("port", 1i64.into())]), &server_schema())
            .unwrap();
        let server = Server::from_value(value, "").unwrap();
        assert_eq!(server.host, "localhost");
        assert_eq!(server.tags, vec!["default".to_string()]);
    }
}
