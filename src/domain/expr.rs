//! Deferred attribute values (CloudFormation intrinsics).
//!
//! Values that only exist once the provisioning engine has created a
//! resource (an API id, a function ARN, an endpoint URL) are expressed as
//! [`Expr`] trees. They serialize to the intrinsic JSON form the engine
//! resolves (`Ref`, `Fn::GetAtt`, `Fn::Join`, `Fn::Sub`) and can report the
//! logical ids they depend on, which is how the graph derives ordering.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::LogicalId;

/// Pseudo parameters supplied by the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    /// `AWS::Partition` (e.g. `aws`, `aws-cn`).
    Partition,
    /// `AWS::Region`.
    Region,
    /// `AWS::AccountId`.
    AccountId,
}

impl Pseudo {
    /// Returns the parameter name as used inside `Ref`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Partition => "AWS::Partition",
            Self::Region => "AWS::Region",
            Self::AccountId => "AWS::AccountId",
        }
    }
}

/// A value resolved by the provisioning engine at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Plain string known at synthesis time.
    Literal(String),
    /// `{"Ref": id}`: the primary identifier of another resource.
    Ref(LogicalId),
    /// `{"Ref": "AWS::..."}`.
    Pseudo(Pseudo),
    /// `{"Fn::GetAtt": [id, attribute]}`.
    GetAtt {
        /// Resource that owns the attribute.
        id: LogicalId,
        /// Attribute name (e.g. `Arn`, `ApiEndpoint`).
        attribute: String,
    },
    /// `{"Fn::Join": [separator, [parts...]]}`.
    Join {
        /// Separator placed between parts.
        separator: String,
        /// Parts to concatenate.
        parts: Vec<Expr>,
    },
    /// `{"Fn::Sub": template}` with only pseudo-parameter placeholders.
    Sub(String),
}

impl Expr {
    /// Wraps a literal string.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// References another resource's primary identifier.
    #[must_use]
    pub fn reference(id: &LogicalId) -> Self {
        Self::Ref(id.clone())
    }

    /// References an attribute of another resource.
    #[must_use]
    pub fn get_att(id: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            id: id.clone(),
            attribute: attribute.into(),
        }
    }

    /// Concatenates parts with no separator.
    ///
    /// Adjacent literals are merged; a single remaining part is returned
    /// as-is, so a concatenation of literals collapses into one
    /// [`Expr::Literal`].
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut merged: Vec<Self> = Vec::new();
        for part in parts {
            if let (Some(Self::Literal(prev)), Self::Literal(next)) = (merged.last_mut(), &part) {
                prev.push_str(next);
                continue;
            }
            merged.push(part);
        }
        if merged.len() > 1 {
            return Self::Join {
                separator: String::new(),
                parts: merged,
            };
        }
        merged.pop().unwrap_or_else(|| Self::Literal(String::new()))
    }

    /// Builds an ARN in the stack's partition, region, and account:
    /// `arn:<partition>:<service>:<region>:<account>:<resource>/<name>`.
    #[must_use]
    pub fn arn(service: &str, resource: Self, resource_name: &str) -> Self {
        Self::concat([
            Self::literal("arn:"),
            Self::Pseudo(Pseudo::Partition),
            Self::literal(format!(":{service}:")),
            Self::Pseudo(Pseudo::Region),
            Self::literal(":"),
            Self::Pseudo(Pseudo::AccountId),
            Self::literal(":"),
            resource,
            Self::literal(format!("/{resource_name}")),
        ])
    }

    /// Returns the literal value, if this expression is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` for the unscoped `*` resource pattern.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.as_literal() == Some("*")
    }

    /// Returns every logical id this expression depends on, in the order
    /// they appear.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    /// Returns the literal fragments of this expression, in order.
    ///
    /// Useful for asserting on the static shape of an ARN or URL.
    #[must_use]
    pub fn literal_fragments(&self) -> Vec<&str> {
        match self {
            Self::Literal(value) => vec![value.as_str()],
            Self::Join { parts, .. } => parts.iter().flat_map(Self::literal_fragments).collect(),
            Self::Ref(_) | Self::Pseudo(_) | Self::GetAtt { .. } | Self::Sub(_) => Vec::new(),
        }
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a LogicalId>) {
        match self {
            Self::Ref(id) | Self::GetAtt { id, .. } => out.push(id),
            Self::Join { parts, .. } => {
                for part in parts {
                    part.collect_references(out);
                }
            }
            Self::Literal(_) | Self::Pseudo(_) | Self::Sub(_) => {}
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Self::Pseudo(pseudo) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", pseudo.as_str())?;
                map.end()
            }
            Self::GetAtt { id, attribute } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[id.as_str(), attribute.as_str()])?;
                map.end()
            }
            Self::Join { separator, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs { separator, parts })?;
                map.end()
            }
            Self::Sub(template) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Sub", template)?;
                map.end()
            }
        }
    }
}

/// `[separator, [parts...]]` argument pair of `Fn::Join`.
struct JoinArgs<'a> {
    separator: &'a str,
    parts: &'a [Expr],
}

impl Serialize for JoinArgs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(self.separator)?;
        seq.serialize_element(self.parts)?;
        seq.end()
    }
}
