use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::store::ProblemStore;
use crate::types::{Problem, Submission, TestCase};

/// Redis key layout - deterministic so the API and CLI never drift
/// Records are stored as JSON strings

pub const PROBLEM_PREFIX: &str = "codebank:problem";
pub const TEST_CASES_PREFIX: &str = "codebank:testcases";
pub const SUBMISSIONS_PREFIX: &str = "codebank:submissions";
pub const PROBLEM_INDEX_KEY: &str = "codebank:problems";

/// Existence check plus both writes, run atomically by the server so an
/// update racing a delete cannot recreate the problem key.
const UPDATE_PROBLEM_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('SET', KEYS[1], ARGV[1])
if ARGV[2] ~= '' then
    redis.call('SET', KEYS[2], ARGV[2])
end
return 1
"#;

pub fn problem_key(id: &Uuid) -> String {
    format!("{}:{}", PROBLEM_PREFIX, id)
}

pub fn test_cases_key(problem_id: &Uuid) -> String {
    format!("{}:{}", TEST_CASES_PREFIX, problem_id)
}

pub fn submissions_key(problem_id: &Uuid) -> String {
    format!("{}:{}", SUBMISSIONS_PREFIX, problem_id)
}

/// Problem store backed by a shared Redis connection manager
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    fn decode<T: DeserializeOwned>(payload: Option<String>) -> StoreResult<Option<T>> {
        match payload {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProblemStore for RedisStore {
    async fn list_problems(&self) -> StoreResult<Vec<Problem>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(PROBLEM_INDEX_KEY).await?;
        let keys: Vec<String> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .map(|id| problem_key(&id))
            .collect();

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut problems = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if let Some(problem) = Self::decode::<Problem>(payload)? {
                problems.push(problem);
            }
        }
        Ok(problems)
    }

    async fn get_problem(&self, id: Uuid) -> StoreResult<Option<Problem>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(problem_key(&id)).await?;
        Self::decode(payload)
    }

    async fn get_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(test_cases_key(&problem_id)).await?;
        Ok(Self::decode(payload)?.unwrap_or_default())
    }

    async fn insert_problem(&self, problem: &Problem, test_cases: &[TestCase]) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let problem_json = serde_json::to_string(problem)?;
        let cases_json = serde_json::to_string(test_cases)?;

        let _: () = redis::pipe()
            .atomic()
            .set(problem_key(&problem.id), problem_json)
            .ignore()
            .set(test_cases_key(&problem.id), cases_json)
            .ignore()
            .sadd(PROBLEM_INDEX_KEY, problem.id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_problem(
        &self,
        problem: &Problem,
        test_cases: Option<&[TestCase]>,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let problem_json = serde_json::to_string(problem)?;
        // Empty string leaves the stored cases untouched
        let cases_json = match test_cases {
            Some(cases) => serde_json::to_string(cases)?,
            None => String::new(),
        };

        let updated: i64 = redis::Script::new(UPDATE_PROBLEM_SCRIPT)
            .key(problem_key(&problem.id))
            .key(test_cases_key(&problem.id))
            .arg(problem_json)
            .arg(cases_json)
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .del(problem_key(&id))
            .del(test_cases_key(&id))
            .ignore()
            .srem(PROBLEM_INDEX_KEY, id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn create_submission(&self, submission: &Submission) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(submission)?;
        let _: () = conn
            .rpush(submissions_key(&submission.problem_id), payload)
            .await?;
        Ok(())
    }

    async fn list_submissions(&self, problem_id: Uuid) -> StoreResult<Vec<Submission>> {
        let mut conn = self.conn.clone();
        let payloads: Vec<String> = conn.lrange(submissions_key(&problem_id), 0, -1).await?;
        payloads
            .iter()
            .map(|data| serde_json::from_str(data).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Difficulty;
    use chrono::Utc;

    #[test]
    fn test_key_naming() {
        let id = Uuid::new_v4();
        assert_eq!(problem_key(&id), format!("codebank:problem:{}", id));
        assert_eq!(test_cases_key(&id), format!("codebank:testcases:{}", id));
        assert_eq!(submissions_key(&id), format!("codebank:submissions:{}", id));
    }

    #[test]
    fn test_keys_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(problem_key(&id), problem_key(&id));
        assert_ne!(problem_key(&id), test_cases_key(&id));
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis instance
    async fn test_problem_roundtrip_through_redis() {
        let store = RedisStore::connect("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis");

        let problem = Problem {
            id: Uuid::new_v4(),
            title: "Echo".to_string(),
            description: "Print the input back".to_string(),
            difficulty: Difficulty::Easy,
            total_points: 5.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_problem(&problem, &[]).await.unwrap();

        assert_eq!(store.get_problem(problem.id).await.unwrap(), Some(problem.clone()));

        let mut renamed = problem.clone();
        renamed.title = "Echo back".to_string();
        assert!(store.update_problem(&renamed, Some(Vec::<TestCase>::new().as_slice())).await.unwrap());
        assert_eq!(store.get_problem(problem.id).await.unwrap(), Some(renamed.clone()));

        assert!(store.delete_problem(problem.id).await.unwrap());
        assert!(store.get_problem(problem.id).await.unwrap().is_none());
        assert!(!store.update_problem(&renamed, None).await.unwrap());
        assert!(store.get_problem(problem.id).await.unwrap().is_none());
    }
}
