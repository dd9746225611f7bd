//! Variable builder
//!
//! Turns a raw data row into typed variables. Each configured template may
//! reference row columns as `${row.COLUMN}` and may end in a `:type` suffix:
//!
//! ```text
//! policy:  "${row.PolicyNumber}"
//! premium: "${row.TotalPremium}:decimal"
//! start:   "${row.EffectiveDate}:date"
//! ```
//!
//! Without a known suffix the substituted text is kept as a string.

use regex::Regex;
use rowproof_core::{ConversionError, ConverterRegistry, DataRow, TypeTag, Value, VariableBag};
use indexmap::IndexMap;
use std::sync::{Arc, OnceLock};

fn row_reference() -> &'static Regex {
    static ROW_REFERENCE: OnceLock<Regex> = OnceLock::new();
    ROW_REFERENCE.get_or_init(|| Regex::new(r"\$\{row\.(\w+)\}").expect("row reference pattern is valid"))
}

/// A variable could not be built from the row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariableError {
    #[error("Column '{column}' not in data row for variable '{variable}'")]
    MissingColumn { column: String, variable: String },

    #[error("Variable '{variable}': Cannot convert '{value}' to '{tag}'. Error: {source}")]
    Conversion {
        variable: String,
        value: String,
        tag: TypeTag,
        #[source]
        source: ConversionError,
    },
}

/// Builds the typed variables for one row
#[derive(Debug, Clone)]
pub struct VariableBuilder {
    converters: Arc<ConverterRegistry>,
}

impl VariableBuilder {
    pub fn new(converters: Arc<ConverterRegistry>) -> Self {
        Self { converters }
    }

    /// Build every variable; the first failure aborts the whole bag
    pub fn build(
        &self,
        row: &DataRow,
        variables_config: &IndexMap<String, String>,
    ) -> Result<VariableBag, VariableError> {
        let mut bag = VariableBag::with_capacity(variables_config.len());
        for (name, template) in variables_config {
            let value = self.build_one(row, name, template)?;
            bag.insert(name.clone(), value);
        }
        Ok(bag)
    }

    fn build_one(&self, row: &DataRow, name: &str, template: &str) -> Result<Value, VariableError> {
        let mut missing = None;
        let substituted = row_reference().replace_all(template, |caps: &regex::Captures<'_>| {
            let column = &caps[1];
            match row.get(column) {
                Some(raw) => raw.clone(),
                None => {
                    missing.get_or_insert_with(|| column.to_string());
                    String::new()
                }
            }
        });

        if let Some(column) = missing {
            return Err(VariableError::MissingColumn {
                column,
                variable: name.to_string(),
            });
        }

        let (raw, tag) = match substituted.rsplit_once(':') {
            Some((prefix, suffix)) => match self.converters.lookup(suffix) {
                Some(tag) => (prefix, tag),
                None => (&*substituted, TypeTag::String),
            },
            None => (&*substituted, TypeTag::String),
        };

        self.converters
            .convert(tag, &Value::from(raw))
            .map_err(|source| VariableError::Conversion {
                variable: name.to_string(),
                value: raw.to_string(),
                tag,
                source,
            })
    }
}
