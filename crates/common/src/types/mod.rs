use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Body of the API index route.
#[derive(Serialize, Deserialize, Debug)]
pub struct Welcome {
    pub message: String,
}
