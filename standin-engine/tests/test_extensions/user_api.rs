use standin_engine::StdResult;
use standin_engine::args;
use standin_engine::entities::{ThrownError, Value};
use standin_engine::module_registry::{ModuleRegistry, ResolvedModule};

use super::HTTP;

/// Code under test: fetches users through the `http` module it is given.
pub struct UserApi {
    http: ResolvedModule,
}

impl UserApi {
    pub fn new(registry: &ModuleRegistry) -> StdResult<Self> {
        Ok(Self {
            http: registry.resolve(HTTP)?,
        })
    }

    pub async fn user_name(&self, id: i64) -> Result<Value, ThrownError> {
        let response = match self.http.call("get", args![format!("/users/{id}")])? {
            Value::Future(future) => future.await?,
            other => other,
        };

        Ok(response
            .get("data")
            .and_then(|data| data.get("name"))
            .cloned()
            .unwrap_or_default())
    }
}
