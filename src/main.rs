/// Provision the Pinecone index and load the hybrid-search encoders.
///
/// # Environment Variables
///
/// - `PINECONE_API_KEY`: required
/// - `PINECONE_ENVIRONMENT`: project environment (needed for pod indexes)
/// - `PINECONE_SETUP_LOG`: logging filter (trace, debug, info, warn, error)
/// - `PINECONE_SETUP_CONFIG`: JSON file with non-secret overrides
fn main() {
    if let Err(err) = pinecone_bootstrap::run() {
        eprintln!("[pinecone-setup] {err:?}");
        std::process::exit(1);
    }
}
