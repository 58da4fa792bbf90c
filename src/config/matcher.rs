/*
 * Copyright 2020 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use serde::{Deserialize, Serialize};

/// Matches a header name (or any other string) by one of several strategies.
///
/// ```yaml
/// - exact: authorization
/// - prefix: x-
///   ignore_case: true
/// - safe_regex: "^x-(user|tenant)-id$"
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum StringMatcher {
    Exact {
        exact: String,
        #[serde(default)]
        ignore_case: bool,
    },
    Prefix {
        prefix: String,
        #[serde(default)]
        ignore_case: bool,
    },
    Suffix {
        suffix: String,
        #[serde(default)]
        ignore_case: bool,
    },
    Contains {
        contains: String,
        #[serde(default)]
        ignore_case: bool,
    },
    SafeRegex {
        #[serde(with = "serde_regex")]
        #[schemars(with = "String")]
        safe_regex: regex::Regex,
    },
}

impl StringMatcher {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact {
            exact: value.into(),
            ignore_case: false,
        }
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self::Prefix {
            prefix: value.into(),
            ignore_case: false,
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        fn fold(value: &str, ignore_case: bool) -> std::borrow::Cow<'_, str> {
            if ignore_case {
                value.to_ascii_lowercase().into()
            } else {
                value.into()
            }
        }

        match self {
            Self::Exact { exact, ignore_case } => {
                fold(value, *ignore_case) == fold(exact, *ignore_case)
            }
            Self::Prefix {
                prefix,
                ignore_case,
            } => fold(value, *ignore_case).starts_with(&*fold(prefix, *ignore_case)),
            Self::Suffix {
                suffix,
                ignore_case,
            } => fold(value, *ignore_case).ends_with(&*fold(suffix, *ignore_case)),
            Self::Contains {
                contains,
                ignore_case,
            } => fold(value, *ignore_case).contains(&*fold(contains, *ignore_case)),
            Self::SafeRegex { safe_regex } => safe_regex.is_match(value),
        }
    }
}

impl PartialEq for StringMatcher {
    fn eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (
                Self::Exact {
                    exact: a,
                    ignore_case: ai,
                },
                Self::Exact {
                    exact: b,
                    ignore_case: bi,
                },
            )
            | (
                Self::Prefix {
                    prefix: a,
                    ignore_case: ai,
                },
                Self::Prefix {
                    prefix: b,
                    ignore_case: bi,
                },
            )
            | (
                Self::Suffix {
                    suffix: a,
                    ignore_case: ai,
                },
                Self::Suffix {
                    suffix: b,
                    ignore_case: bi,
                },
            )
            | (
                Self::Contains {
                    contains: a,
                    ignore_case: ai,
                },
                Self::Contains {
                    contains: b,
                    ignore_case: bi,
                },
            ) => a == b && ai == bi,
            (Self::SafeRegex { safe_regex: a }, Self::SafeRegex { safe_regex: b }) => {
                a.as_str() == b.as_str()
            }
            _ => false,
        }
    }
}

/// Returns whether any of `matchers` matches `value`.
pub fn any_match(matchers: &[StringMatcher], value: &str) -> bool {
    matchers.iter().any(|matcher| matcher.is_match(value))
}

/// Allow and deny lists applied to request header names. A name passes when
/// it matches the allow list (or no allow list is configured) and matches
/// nothing in the deny list; the deny list wins when both match.
#[derive(Clone, Copy, Debug)]
pub struct HeaderMatchers<'a> {
    pub allowed: Option<&'a [StringMatcher]>,
    pub disallowed: &'a [StringMatcher],
}

impl HeaderMatchers<'_> {
    pub fn includes(&self, name: &str) -> bool {
        self.allowed.map_or(true, |allowed| any_match(allowed, name))
            && !any_match(self.disallowed, name)
    }
}
