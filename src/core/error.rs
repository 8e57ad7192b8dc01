use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Raw input or a response document is not well-formed JSON.
    InvalidJson,
    /// Input serializes to a JSON shape the wire contract rejects.
    UnsupportedShape,
    /// Input resolved to JSON null instead of an object.
    NilInput,
    /// The HTTP round trip itself failed (connect, DNS, timeout, read).
    Transport,
    /// The server answered with a status outside [200, 300).
    Status,
    /// A scan call was given no destinations.
    NoDestination,
    /// A scan destination cannot be addressed (empty field name).
    InvalidDestination,
    /// Whole-document and field destinations mixed in one scan call.
    MixedDestinations,
    /// A requested field name is absent from the response document.
    FieldNotFound,
    /// A document or field decoded to a shape the destination rejects.
    TypeMismatch,
    /// Client construction or call-site misuse (bad base URL, empty endpoint).
    Config,
    /// Invariant violation inside the client; not expected in normal operation.
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    endpoint: Option<String>,
    field: Option<String>,
    status: Option<u16>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            endpoint: None,
            field: None,
            status: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(endpoint) = &self.endpoint {
            write!(f, " (endpoint: {endpoint})")?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}
