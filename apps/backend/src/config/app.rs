//! Typed configuration tree.
//!
//! YAML keys are lowercase (`imagemaxsize`, `sitetitle`, ...); the camelCase
//! spellings are accepted as aliases. Unknown keys are ignored and missing
//! keys fall back to the zero value of their type.

use db_infra::DatabaseSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub upload: UploadSettings,
    pub setting: SiteSettings,
}

impl AppConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: String,
    pub host: String,
    /// `debug` or `release`
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt: JwtSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    /// Token lifetime in seconds
    pub expires: i64,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    #[serde(alias = "imageMaxSize")]
    pub imagemaxsize: i64,
    #[serde(alias = "audioMaxSize")]
    pub audiomaxsize: i64,
    #[serde(alias = "allowedTypes")]
    pub allowedtypes: Vec<String>,
    #[serde(alias = "imagePath")]
    pub imagepath: String,
    #[serde(alias = "audioPath")]
    pub audiopath: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    #[serde(alias = "siteTitle")]
    pub sitetitle: String,
    #[serde(alias = "serverName")]
    pub servername: String,
    #[serde(alias = "serverURL", alias = "serverUrl")]
    pub serverurl: String,
    #[serde(alias = "allowRegister")]
    pub allowregister: bool,
    #[serde(alias = "icpNumber")]
    pub icpnumber: String,
    #[serde(alias = "metingAPI", alias = "metingApi")]
    pub metingapi: String,
    #[serde(alias = "customCSS", alias = "customCss")]
    pub customcss: String,
    #[serde(alias = "customJS", alias = "customJs")]
    pub customjs: String,
}
