//! Print the OpenAPI document of the HTTP API as pretty JSON on stdout.

use tictactoe_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi().to_pretty_json()?;
    println!("{doc}");
    Ok(())
}
