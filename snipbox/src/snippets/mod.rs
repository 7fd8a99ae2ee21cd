mod errors;
mod store;
mod types;

pub use errors::SnippetError;
pub use store::SnippetStore;
pub use types::Snippet;

pub async fn init() -> Result<(), SnippetError> {
    SnippetStore::init().await
}
