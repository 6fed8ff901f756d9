pub async fn init_env() {
    // Deployments pass real environment variables; `.env` is for local runs.
    let _ = dotenvy::dotenv();
}
