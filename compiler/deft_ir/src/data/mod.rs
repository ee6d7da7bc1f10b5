//! Host-supplied data.
//!
//! `Data` is what callers hand to the engine (render context and engine
//! globals). It is plain owned data with no identity: the renderer
//! materializes it into its own per-call arena before use, so shared globals
//! are never mutated by a render.

/// A value supplied by the host application.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Data {
    /// The null value.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Data>),
    /// Ordered map; insertion order is preserved through rendering.
    Map(Vec<(String, Data)>),
}

impl Data {
    /// Build a map from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Data>,
        I: IntoIterator<Item = (K, V)>,
    {
        Data::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list from values.
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Data>,
        I: IntoIterator<Item = V>,
    {
        Data::List(items.into_iter().map(Into::into).collect())
    }

    /// Get the type name for messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Data::None => "none",
            Data::Bool(_) => "bool",
            Data::Int(_) => "int",
            Data::Float(_) => "float",
            Data::Str(_) => "str",
            Data::List(_) => "list",
            Data::Map(_) => "map",
        }
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Data::Bool(b)
    }
}

impl From<i64> for Data {
    fn from(n: i64) -> Self {
        Data::Int(n)
    }
}

impl From<i32> for Data {
    fn from(n: i32) -> Self {
        Data::Int(i64::from(n))
    }
}

impl From<f64> for Data {
    fn from(f: f64) -> Self {
        Data::Float(f)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::Str(s.to_string())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::Str(s)
    }
}

impl<T: Into<Data>> From<Vec<T>> for Data {
    fn from(items: Vec<T>) -> Self {
        Data::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Data::None, Into::into)
    }
}
