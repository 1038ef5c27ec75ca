use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::messages;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AccessContext, Claims, TokenService};
use crate::database::{Backend, UnitOfWork};
use crate::requests::validation::{self, Rule};
use crate::services::ServiceError;
use crate::types::PrincipalKind;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Device token registered on requester login
    #[serde(default)]
    pub notification_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

const LOGIN_RULES: [(&str, &[Rule]); 2] = [
    ("email", &[Rule::Required, Rule::Email]),
    ("password", &[Rule::Required]),
];

const CHANGE_PASSWORD_RULES: [(&str, &[Rule]); 2] = [
    ("old_password", &[Rule::Required]),
    ("new_password", &[Rule::Required, Rule::MinLen(8)]),
];

fn invalid_login() -> ServiceError {
    ServiceError::Auth(messages::ERROR_INVALID_LOGIN.to_string())
}

fn check(rules: [(&'static str, &'static [Rule]); 2], values: [(&str, &str); 2]) -> Result<(), ServiceError> {
    let values: BTreeMap<String, String> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    validation::validate(rules, &values).map_err(ServiceError::Validation)
}

/// bcrypt is CPU-bound; keep it off the async workers
async fn password_matches(plain: &str, hash: &str) -> Result<bool, ServiceError> {
    let (plain, hash) = (plain.to_string(), hash.to_string());
    Ok(tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?)
}

async fn hash(plain: &str, cost: u32) -> Result<String, ServiceError> {
    let plain = plain.to_string();
    Ok(tokio::task::spawn_blocking(move || hash_password(&plain, cost)).await??)
}

/// Login and credential changes for both principal kinds
pub struct AuthService<S: Backend> {
    store: S,
    tokens: Arc<TokenService>,
    bcrypt_cost: u32,
}

impl<S: Backend> AuthService<S> {
    pub fn new(store: S, tokens: Arc<TokenService>, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
        }
    }

    /// Unknown email and wrong password fail with the same message. A
    /// non-empty device token is stored in the same transaction.
    pub async fn login_requester(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        check(
            LOGIN_RULES,
            [("email", &request.email), ("password", &request.password)],
        )?;

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            let requester = self
                .store
                .find_requester_by_email(uow.tx(), &request.email)
                .await?
                .ok_or_else(invalid_login)?;
            if !password_matches(&request.password, &requester.password).await? {
                return Err(invalid_login());
            }
            if let Some(token) = request.notification_token.as_deref().filter(|t| !t.trim().is_empty()) {
                self.store
                    .set_notification_token(uow.tx(), requester.id, token)
                    .await?;
            }
            Ok(requester)
        }
        .await;
        let requester = uow.complete(outcome).await?;

        let claims = Claims::for_requester(&requester, self.tokens.lifetime());
        let access_token = self.tokens.issue(&claims, PrincipalKind::Requester)?;
        info!("Requester {} logged in", requester.id);
        Ok(LoginResponse {
            access_token,
            role_id: None,
        })
    }

    pub async fn login_reviewer(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        check(
            LOGIN_RULES,
            [("email", &request.email), ("password", &request.password)],
        )?;

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            let reviewer = self
                .store
                .find_reviewer_by_email(uow.tx(), &request.email)
                .await?
                .ok_or_else(invalid_login)?;
            if !password_matches(&request.password, &reviewer.password).await? {
                return Err(invalid_login());
            }
            Ok(reviewer)
        }
        .await;
        let reviewer = uow.complete(outcome).await?;

        let claims = Claims::for_reviewer(&reviewer, self.tokens.lifetime());
        let access_token = self.tokens.issue(&claims, PrincipalKind::Reviewer)?;
        info!("Reviewer {} logged in", reviewer.email);
        Ok(LoginResponse {
            access_token,
            role_id: Some(reviewer.role_id),
        })
    }

    /// Requesters are looked up by id, reviewers by email
    pub async fn change_password(
        &self,
        ctx: &AccessContext,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        check(
            CHANGE_PASSWORD_RULES,
            [
                ("old_password", &request.old_password),
                ("new_password", &request.new_password),
            ],
        )?;

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<(), ServiceError> = async {
            match ctx {
                AccessContext::Requester { id } => {
                    let requester = self
                        .store
                        .find_requester_by_id(uow.tx(), *id)
                        .await?
                        .ok_or_else(invalid_login)?;
                    if !password_matches(&request.old_password, &requester.password).await? {
                        return Err(invalid_login());
                    }
                    let hashed = hash(&request.new_password, self.bcrypt_cost).await?;
                    self.store
                        .set_requester_password(uow.tx(), requester.id, &hashed)
                        .await?;
                }
                AccessContext::Reviewer { email, .. } => {
                    let reviewer = self
                        .store
                        .find_reviewer_by_email(uow.tx(), email)
                        .await?
                        .ok_or_else(invalid_login)?;
                    if !password_matches(&request.old_password, &reviewer.password).await? {
                        return Err(invalid_login());
                    }
                    let hashed = hash(&request.new_password, self.bcrypt_cost).await?;
                    self.store
                        .set_reviewer_password(uow.tx(), reviewer.id, &hashed)
                        .await?;
                }
            }
            Ok(())
        }
        .await;

        if let Err(ServiceError::Auth(_)) = &outcome {
            warn!("Password change rejected for {} principal", ctx.kind().as_str());
        }
        uow.complete(outcome).await
    }
}
