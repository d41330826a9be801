//! Symbolic method names and the endpoint paths they map to.
//!
//! `lists_subscribe` becomes `/2.0/lists/subscribe.json` on the standard
//! surface and `/export/1.0/lists/` on the export surface. Export endpoints
//! are resource-only, so the action suffix is dropped there.

/// Which API surface a call targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiMode {
    /// JSON-RPC style endpoints returning a single JSON value.
    #[default]
    Standard,
    /// Bulk endpoints returning newline-delimited JSON.
    Export,
}

impl ApiMode {
    pub fn is_export(self) -> bool {
        self == ApiMode::Export
    }
}

impl From<bool> for ApiMode {
    fn from(export: bool) -> Self {
        if export {
            ApiMode::Export
        } else {
            ApiMode::Standard
        }
    }
}

/// A method name split into its primary resource and optional action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMethod {
    resource: String,
    action: Option<String>,
}

impl RemoteMethod {
    /// Split `name` on underscores. Any name is accepted; whether the
    /// service knows it is only discovered remotely.
    pub fn parse(name: &str) -> Self {
        let mut tokens = name.split('_');
        let resource = tokens.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = tokens.collect();
        let action = if rest.is_empty() {
            None
        } else {
            Some(rest.join("-"))
        };
        Self { resource, action }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn path(&self, mode: ApiMode) -> String {
        match (mode, &self.action) {
            (ApiMode::Export, _) => format!("/export/1.0/{}/", self.resource),
            (ApiMode::Standard, Some(action)) => format!("/2.0/{}/{action}.json", self.resource),
            (ApiMode::Standard, None) => format!("/2.0/{}.json", self.resource),
        }
    }
}
