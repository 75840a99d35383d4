use std::sync::Arc;

use serde_json::Value;

use crate::{logger::Logger, params::ParamBag};

/// Immutable carrier for request-scoped params.
///
/// Every derivation returns a new `Context`; the receiver and any siblings
/// derived from it are never touched. Cloning is cheap since the bag sits
/// behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Context {
    params: Arc<ParamBag>,
    logger: Option<Arc<Logger>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// New context carrying this one's params plus `key`.
    pub fn add_param(&self, key: impl Into<String>, value: impl Into<Value>) -> Context {
        let mut bag = ParamBag::clone(&self.params);
        bag.set(key, value);
        self.derive(bag)
    }

    pub fn add_params(&self, params: &ParamBag) -> Context {
        self.derive(self.params.merged(params))
    }

    /// Copy of the attached params; empty when none were ever added.
    pub fn params(&self) -> ParamBag {
        ParamBag::clone(&self.params)
    }

    pub fn param_bag(&self) -> &ParamBag {
        &self.params
    }

    pub(crate) fn logger(&self) -> Option<&Arc<Logger>> {
        self.logger.as_ref()
    }

    pub(crate) fn with_logger(&self, logger: Arc<Logger>) -> Context {
        Context {
            params: Arc::clone(&self.params),
            logger: Some(logger),
        }
    }

    fn derive(&self, params: ParamBag) -> Context {
        Context {
            params: Arc::new(params),
            logger: self.logger.clone(),
        }
    }
}
