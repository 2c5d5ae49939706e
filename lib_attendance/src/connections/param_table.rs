//! Business parameters read from `parametros_sistema` in the control database.

use std::sync::Arc;

use async_trait::async_trait;

use super::store::{Database, RelationalStore, SqlValue};
use crate::configs::{ParamError, ParamKey, ParamSource};

const SELECT_PARAM: &str =
    "SELECT prm_valor FROM parametros_sistema WHERE id_grupo = $1 AND prm_descripcion = $2";

/// `ParamSource` that queries the parameter table on every call.
#[derive(Clone)]
pub struct SqlParamSource {
    store: Arc<dyn RelationalStore>,
}

impl SqlParamSource {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ParamSource for SqlParamSource {
    async fn get_param(&self, key: ParamKey) -> Result<Option<String>, ParamError> {
        let row = self
            .store
            .select_one(
                Database::Control,
                SELECT_PARAM,
                &[SqlValue::from(key.group), SqlValue::from(key.name)],
            )
            .await
            .map_err(|e| ParamError::Source(e.to_string()))?;

        Ok(row.and_then(|cols| cols.first().and_then(SqlValue::to_text)))
    }
}
