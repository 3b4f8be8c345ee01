//! Client for the Hutte REST API.

mod client;
mod types;

pub use client::{AUTH_ERROR, DEFAULT_API_URL, HutteApi, HutteClient};
pub use types::{Credentials, ScratchOrg, ScratchOrgResponse};

#[cfg(test)]
pub use client::MockHutteApi;
