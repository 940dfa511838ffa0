//! Loads the keyword taxonomy (`filter.json`) used to classify transactions.
//!
//! The file maps category names to subcategory names to either a single
//! keyword or a list of keywords:
//!
//! ```json
//! {
//!     "Expenses": {
//!         "Food": ["COFFEE", "BAKERY"],
//!         "Rent": "LANDLORD LTD"
//!     }
//! }
//! ```
//!
//! Both forms are normalized to an uppercased keyword list at load time, so
//! classification is a plain case-insensitive substring check with no
//! per-transaction case conversion of the keywords. Category and subcategory
//! order follows the file and is preserved all the way into the report.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

/// One keyword leaf as written in the file: a keyword or a list of keywords.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordSpec {
    One(String),
    Many(Vec<String>),
}

/// A subcategory and the uppercased keywords that route transactions into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Subcategory {
    /// Whether any keyword occurs in the given already-uppercased description.
    pub fn matches(&self, upper_description: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| upper_description.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub subcategories: Vec<Subcategory>,
}

/// The user's category → subcategory → keywords mapping, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    pub categories: Vec<Category>,
}

impl Taxonomy {
    pub fn load(path: &Path) -> Result<Taxonomy, Error> {
        let text = fs::read_to_string(path).map_err(|err| Error::config(path, err.to_string()))?;
        Self::from_json(&text).map_err(|message| Error::config(path, message))
    }

    fn from_json(text: &str) -> Result<Taxonomy, String> {
        let root: serde_json::Value = serde_json::from_str(text).map_err(|err| err.to_string())?;
        let root = root
            .as_object()
            .ok_or("expected an object mapping categories to subcategories")?;

        let mut categories = Vec::with_capacity(root.len());
        for (category_name, subcategories) in root {
            let subcategories = subcategories.as_object().ok_or_else(|| {
                format!("category '{category_name}' must map subcategories to keywords")
            })?;

            let mut parsed = Vec::with_capacity(subcategories.len());
            for (subcategory_name, spec) in subcategories {
                let spec: KeywordSpec = serde_json::from_value(spec.clone()).map_err(|_| {
                    format!(
                        "keywords for '{category_name}/{subcategory_name}' must be \
                         a string or a list of strings"
                    )
                })?;
                let keywords = match spec {
                    KeywordSpec::One(keyword) => vec![keyword.to_uppercase()],
                    KeywordSpec::Many(keywords) => keywords
                        .into_iter()
                        .map(|keyword| keyword.to_uppercase())
                        .collect(),
                };
                parsed.push(Subcategory {
                    name: subcategory_name.clone(),
                    keywords,
                });
            }
            categories.push(Category {
                name: category_name.clone(),
                subcategories: parsed,
            });
        }

        Ok(Taxonomy { categories })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_accept_single_keywords_and_keyword_lists() {
        let taxonomy = Taxonomy::from_json(
            r#"{
                "Expenses": {
                    "Food": ["coffee", "Bakery"],
                    "Rent": "landlord ltd"
                },
                "Income": {
                    "Salary": ["ACME PAYROLL"]
                }
            }"#,
        )
        .expect("taxonomy");

        assert_eq!(
            Taxonomy {
                categories: vec![
                    Category {
                        name: "Expenses".to_owned(),
                        subcategories: vec![
                            Subcategory {
                                name: "Food".to_owned(),
                                keywords: vec!["COFFEE".to_owned(), "BAKERY".to_owned()],
                            },
                            Subcategory {
                                name: "Rent".to_owned(),
                                keywords: vec!["LANDLORD LTD".to_owned()],
                            },
                        ],
                    },
                    Category {
                        name: "Income".to_owned(),
                        subcategories: vec![Subcategory {
                            name: "Salary".to_owned(),
                            keywords: vec!["ACME PAYROLL".to_owned()],
                        }],
                    },
                ],
            },
            taxonomy
        );
    }

    #[test]
    fn should_preserve_file_order() {
        let taxonomy = Taxonomy::from_json(
            r#"{"Zebra": {"Z": "Z"}, "Alpha": {"A": "A"}, "Middle": {"M": "M"}}"#,
        )
        .expect("taxonomy");
        let names: Vec<&str> = taxonomy
            .categories
            .iter()
            .map(|category| category.name.as_str())
            .collect();
        assert_eq!(vec!["Zebra", "Alpha", "Middle"], names);
    }

    #[test]
    fn should_match_keywords_as_case_insensitive_substrings() {
        let subcategory = Subcategory {
            name: "Food".to_owned(),
            keywords: vec!["COFFEE".to_owned()],
        };
        assert!(subcategory.matches(&"Downtown Coffee Shop 42".to_uppercase()));
        assert!(!subcategory.matches(&"Hardware store".to_uppercase()));
    }

    #[test]
    fn should_reject_a_keyword_leaf_that_is_neither_string_nor_list() {
        let error = Taxonomy::from_json(r#"{"Expenses": {"Food": 42}}"#).expect_err("bad leaf");
        assert_eq!(
            "keywords for 'Expenses/Food' must be a string or a list of strings",
            error
        );
    }

    #[test]
    fn should_reject_a_category_that_is_not_an_object() {
        let error = Taxonomy::from_json(r#"{"Expenses": ["COFFEE"]}"#).expect_err("bad category");
        assert_eq!(
            "category 'Expenses' must map subcategories to keywords",
            error
        );
    }

    #[test]
    fn should_reject_a_top_level_that_is_not_an_object() {
        assert!(Taxonomy::from_json("[]").is_err());
    }

    #[test]
    fn should_report_a_missing_file_as_a_configuration_error() {
        let error =
            Taxonomy::load(Path::new("does-not-exist/filter.json")).expect_err("missing file");
        assert!(matches!(error, Error::Config { .. }));
    }
}
