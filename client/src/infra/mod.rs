//! Infrastructure layer - IAM auth, HTTP transport and archive packaging

pub mod archive;
pub mod auth;
pub mod transport;

pub use archive::{Packager, TarPackager};
pub use auth::{IamAuthenticator, StaticToken, Token, TokenSource};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, RequestBody, Transport};
