use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

const SESSION_TOKEN_LENGTH: usize = 30;

fn session_key(session_token: &str) -> String {
    format!("session_token:{}:user_id", session_token)
}

pub fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();

    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(SESSION_TOKEN_LENGTH)
        .collect()
}

#[tracing::instrument(name = "Store a session in Redis", skip(redis_client, session_token))]
pub async fn store_session(
    redis_client: &redis::Client,
    session_token: &str,
    user_id: Uuid,
    ttl_seconds: u64,
) -> Result<(), redis::RedisError> {
    let mut redis_conn = redis_client.get_tokio_connection().await?;

    redis::cmd("SET")
        .arg(session_key(session_token))
        .arg(user_id.to_string())
        .arg("EX")
        .arg(ttl_seconds)
        .query_async(&mut redis_conn)
        .await
}

/// Resolves a session token to its user. Unknown, expired or corrupted tokens resolve to `None`.
#[tracing::instrument(name = "Look up a session in Redis", skip(redis_client, session_token))]
pub async fn get_session_user(
    redis_client: &redis::Client,
    session_token: &str,
) -> Result<Option<Uuid>, redis::RedisError> {
    let mut redis_conn = redis_client.get_tokio_connection().await?;

    let user_id: Option<String> = redis::cmd("GET")
        .arg(session_key(session_token))
        .query_async(&mut redis_conn)
        .await?;

    Ok(user_id.and_then(|user_id| Uuid::parse_str(&user_id).ok()))
}
