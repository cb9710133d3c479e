//! IAM policy statements and the resources that carry them.

use serde::Serialize;

use super::{Expr, LogicalId};

/// IAM policy language version used for every document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect. The descriptor only ever grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Effect {
    /// Grants the listed actions.
    Allow,
}

/// A single permission grant: effect, actions, and resource patterns.
///
/// Immutable once built; a policy resource owns one or more statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Allow or deny.
    pub effect: Effect,
    /// Service actions (e.g. `bedrock:InvokeModel`).
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    /// Resource patterns the actions may target.
    #[serde(rename = "Resource")]
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    /// Creates an `Allow` statement.
    #[must_use]
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = Expr>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().collect(),
        }
    }

    /// Returns `true` if any resource pattern is the unscoped `*`.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.resources.iter().any(Expr::is_wildcard)
    }

    /// Returns every logical id referenced by the resource patterns.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        self.resources.iter().flat_map(Expr::references).collect()
    }
}

/// A versioned list of statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PolicyDocument {
    /// Policy language version.
    #[serde(rename = "Version")]
    pub version: &'static str,
    /// Statements in declaration order.
    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Creates a document holding the given statements.
    #[must_use]
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statements,
        }
    }
}

/// Trust relationship of an execution role (`sts:AssumeRole` by a
/// service principal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrustPolicy {
    /// Service principal allowed to assume the role.
    pub service: String,
}

impl Serialize for TrustPolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": self.service },
            }],
        })
        .serialize(serializer)
    }
}

/// An execution role (`AWS::IAM::Role`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleSpec {
    /// Who may assume the role.
    pub trust: TrustPolicy,
    /// Attached AWS-managed policy ARNs.
    pub managed_policy_arns: Vec<Expr>,
}

impl RoleSpec {
    /// Role assumable by Lambda with basic CloudWatch Logs access.
    #[must_use]
    pub fn lambda_execution() -> Self {
        Self {
            trust: TrustPolicy {
                service: "lambda.amazonaws.com".to_string(),
            },
            managed_policy_arns: vec![Expr::concat([
                Expr::literal("arn:"),
                Expr::Pseudo(super::Pseudo::Partition),
                Expr::literal(":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
            ])],
        }
    }

    /// Returns every logical id referenced by the role.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        self.managed_policy_arns
            .iter()
            .flat_map(Expr::references)
            .collect()
    }
}

/// An inline policy attached to roles (`AWS::IAM::Policy`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicySpec {
    /// Policy name, unique per role.
    pub name: String,
    /// Granted permissions.
    pub document: PolicyDocument,
    /// Roles the policy is attached to.
    pub roles: Vec<LogicalId>,
}

impl PolicySpec {
    /// Creates a single-statement policy attached to one role.
    #[must_use]
    pub fn for_role(name: impl Into<String>, role: &LogicalId, statement: PolicyStatement) -> Self {
        Self {
            name: name.into(),
            document: PolicyDocument::new(vec![statement]),
            roles: vec![role.clone()],
        }
    }

    /// Returns every action granted by the document.
    #[must_use]
    pub fn actions(&self) -> Vec<&str> {
        self.document
            .statements
            .iter()
            .flat_map(|s| s.actions.iter().map(String::as_str))
            .collect()
    }

    /// Returns every resource pattern in the document.
    #[must_use]
    pub fn resources(&self) -> Vec<&Expr> {
        self.document
            .statements
            .iter()
            .flat_map(|s| s.resources.iter())
            .collect()
    }

    /// Returns every logical id the policy depends on (attached roles and
    /// resource patterns).
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        self.roles
            .iter()
            .chain(self.document.statements.iter().flat_map(PolicyStatement::references))
            .collect()
    }
}
