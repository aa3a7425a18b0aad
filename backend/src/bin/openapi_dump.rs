//! Print the trust engine OpenAPI document as JSON for client generators.

use std::io::{self, Write};

use krishilok::ApiDoc;
use utoipa::OpenApi;

fn main() -> io::Result<()> {
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .map_err(io::Error::other)?;
    writeln!(io::stdout().lock(), "{document}")
}
