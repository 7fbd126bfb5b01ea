mod request;
mod response;

pub use request::*;
pub use response::*;

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ArticleQueryParams {
    #[serde(default = "get_default_page")]
    pub page: u32,
    #[serde(default = "get_default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

fn get_default_page() -> u32 {
    1
}

fn get_default_limit() -> u32 {
    10
}
