/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Operation pagination.
//!
//! A paginator repeatedly calls one operation, threading the continuation
//! token from each page's output back into the next call's parameters.
//! Iteration is lazy: no call is made until the iterator is advanced, and
//! each `pages()` iteration carries its own token state.

use crate::client::Client;
use crate::error::Error;
use skiff_model::paginate::PageConfig;
use skiff_types::Document;
use std::collections::HashMap;
use tracing::debug;

/// A pagination-capable view over one operation of a [`Client`].
#[derive(Debug)]
pub struct Paginator<'a> {
    client: &'a Client,
    operation: String,
    config: PageConfig,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(client: &'a Client, operation: String, config: PageConfig) -> Self {
        Self {
            client,
            operation,
            config,
        }
    }

    /// The pagination config, including `result_key` for locating each
    /// page's items.
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Returns a lazy iterator over pages, starting from `params`.
    pub fn pages(&self, params: Document) -> Pages<'a> {
        Pages {
            client: self.client,
            operation: self.operation.clone(),
            config: self.config.clone(),
            base_params: params,
            next_token: None,
            done: false,
            started: false,
        }
    }
}

/// Iterator over the pages of one paginated call.
///
/// The first error ends iteration after being yielded.
#[derive(Debug)]
pub struct Pages<'a> {
    client: &'a Client,
    operation: String,
    config: PageConfig,
    base_params: Document,
    next_token: Option<Document>,
    done: bool,
    started: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<Document, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started && self.next_token.is_none() {
            self.done = true;
            return None;
        }
        self.started = true;

        let params = merge_token(
            &self.base_params,
            &self.config.input_token,
            self.next_token.as_ref(),
        );
        match self.client.call(&self.operation, params) {
            Ok(page) => {
                self.next_token = continuation_token(&page, &self.config.output_token);
                if self.next_token.is_none() {
                    debug!(operation = %self.operation, "pagination complete");
                    self.done = true;
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Base params with the continuation token threaded in under `input_token`.
fn merge_token(base: &Document, input_token: &str, token: Option<&Document>) -> Document {
    let Some(token) = token else {
        return base.clone();
    };
    let mut params = match base {
        Document::Null => Document::Object(HashMap::new()),
        other => other.clone(),
    };
    if let Some(object) = params.as_object_mut() {
        object.insert(input_token.to_string(), token.clone());
    }
    params
}

/// The next continuation token, when the page has one. Absent, null, and
/// empty-string tokens all mean the end of the result set.
fn continuation_token(page: &Document, output_token: &str) -> Option<Document> {
    match page.get_path(output_token) {
        None | Some(Document::Null) => None,
        Some(Document::String(s)) if s.is_empty() => None,
        Some(token) => Some(token.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_model::json::to_document;

    #[test]
    fn merge_threads_token_into_base_params() {
        let base = to_document(serde_json::json!({ "MaxRecords": 10 }));
        let token = Document::from("page-2");
        let merged = merge_token(&base, "NextToken", Some(&token));
        assert_eq!(merged.get("MaxRecords"), base.get("MaxRecords"));
        assert_eq!(merged.get("NextToken"), Some(&token));
        // The base is untouched.
        assert_eq!(base.get("NextToken"), None);
    }

    #[test]
    fn merge_without_token_is_the_base() {
        let base = to_document(serde_json::json!({ "MaxRecords": 10 }));
        assert_eq!(merge_token(&base, "NextToken", None), base);
    }

    #[test]
    fn empty_and_null_tokens_end_pagination() {
        let with_token = to_document(serde_json::json!({ "NextToken": "B" }));
        assert!(continuation_token(&with_token, "NextToken").is_some());

        let empty = to_document(serde_json::json!({ "NextToken": "" }));
        assert!(continuation_token(&empty, "NextToken").is_none());

        let null = to_document(serde_json::json!({ "NextToken": null }));
        assert!(continuation_token(&null, "NextToken").is_none());

        let absent = to_document(serde_json::json!({}));
        assert!(continuation_token(&absent, "NextToken").is_none());
    }

    #[test]
    fn nested_output_token_paths_resolve() {
        let page = to_document(serde_json::json!({
            "Marker": { "Next": "deep" }
        }));
        assert_eq!(
            continuation_token(&page, "Marker.Next"),
            Some(Document::from("deep"))
        );
    }
}
