//! Set cover parameters.

use std::{
    io::Read,
    path::Path,
};
use crate::{
    Error,
    err::{validate_param, add_path},
    ext,
    cost::CostPolicy,
};

/// Extracts field `$var` from JSON object, converting it with `$convert` (for example, `as_u32`).
macro_rules! json_get {
    ($obj:ident -> $var:ident ($convert:ident)) => {
        let $var = $obj[stringify!($var)].$convert().ok_or_else(|| Error::JsonLoad(
            format!("Failed to parse '{}': missing or incorrect field '{}'", $obj, stringify!($var))))?;
    };
}

/// Set cover parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// How sample costs are calculated.
    pub cost_policy: CostPolicy,
    /// Select carriers of singleton variants before running the solver.
    pub reduce_singletons: bool,
    /// Maximal number of solver iterations (one sample is selected per iteration).
    pub max_iters: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cost_policy: CostPolicy::Uniform,
            reduce_singletons: true,
            max_iters: 20,
        }
    }
}

impl Params {
    pub fn validate(&self) -> crate::Result<()> {
        validate_param!(self.max_iters > 0, "Maximal number of iterations ({}) must be positive", self.max_iters);
        if self.max_iters < 5 {
            log::warn!("Maximal number of iterations ({}) is very small, cover may be incomplete", self.max_iters);
        }
        Ok(())
    }

    pub fn to_json(&self) -> json::JsonValue {
        let mut obj = json::JsonValue::new_object();
        obj["cost_policy"] = self.cost_policy.as_str().into();
        obj["reduce_singletons"] = self.reduce_singletons.into();
        obj["max_iters"] = self.max_iters.into();
        obj
    }

    /// Loads parameters from a JSON object. Missing keys keep default values.
    pub fn from_json(obj: &json::JsonValue) -> crate::Result<Self> {
        if !obj.is_object() {
            return Err(Error::JsonLoad(format!("Failed to parse '{}': must be an object", obj)));
        }
        let mut params = Self::default();
        if obj.has_key("cost_policy") {
            json_get!(obj -> cost_policy (as_str));
            params.cost_policy = cost_policy.parse()?;
        }
        if obj.has_key("reduce_singletons") {
            json_get!(obj -> reduce_singletons (as_bool));
            params.reduce_singletons = reduce_singletons;
        }
        if obj.has_key("max_iters") {
            json_get!(obj -> max_iters (as_u32));
            params.max_iters = max_iters;
        }
        for (key, _) in obj.entries() {
            if !matches!(key, "cost_policy" | "reduce_singletons" | "max_iters") {
                log::warn!("Unknown parameter '{}' is ignored", key);
            }
        }
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a JSON file (possibly gzipped).
    pub fn load(filename: &Path) -> crate::Result<Self> {
        let mut s = String::new();
        ext::sys::open(filename).map_err(add_path!(filename))?
            .read_to_string(&mut s).map_err(add_path!(filename))?;
        Self::from_json(&json::parse(&s)?)
    }
}
