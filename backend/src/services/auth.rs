//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::validation::{validate_email, validate_password};
use shared::UserProfile;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new user
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub profile: Option<UserProfile>,
}

/// Input for logging in
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for refreshing tokens
#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub profile: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response after successful registration or login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserInfo,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Public user information
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile: String,
    pub last_access: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// User row with credentials
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    phone: Option<String>,
    profile: String,
    is_active: bool,
    last_access: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new user
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        validate_email(&input.email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
            message_pt: "Formato de e-mail inválido".to_string(),
        })?;
        validate_password(&input.password).map_err(|msg| AppError::Validation {
            field: "password".to_string(),
            message: msg.to_string(),
            message_pt: "A senha deve ter pelo menos 8 caracteres".to_string(),
        })?;
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
                message_pt: "O nome não pode ser vazio".to_string(),
            });
        }

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;
        if existing {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let profile = input.profile.unwrap_or_default();

        let user = sqlx::query_as::<_, UserInfo>(
            r#"
            INSERT INTO users (name, email, password_hash, phone, profile)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, profile, last_access, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.phone)
        .bind(profile.as_str())
        .fetch_one(&self.db)
        .await?;

        let tokens = self.issue_tokens(user.id, profile)?;
        Ok(AuthResponse { user, tokens })
    }

    /// Authenticate with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, name, phone, profile, is_active,
                   last_access, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_access = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let profile = UserProfile::parse(&user.profile).unwrap_or_default();
        let tokens = self.issue_tokens(user.id, profile)?;
        Ok(AuthResponse {
            user: UserInfo {
                id: user.id,
                name: user.name,
                email: user.email,
                phone: user.phone,
                profile: user.profile,
                last_access: user.last_access,
                created_at: user.created_at,
            },
            tokens,
        })
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, input: RefreshInput) -> AppResult<AuthTokens> {
        let claims = self.decode_token(&input.refresh_token)?;
        if claims.token_type != "refresh" {
            return Err(AppError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        let (profile, is_active) = sqlx::query_as::<_, (String, bool)>(
            "SELECT profile, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        if !is_active {
            return Err(AppError::InvalidToken);
        }

        let profile = UserProfile::parse(&profile).unwrap_or_default();
        self.issue_tokens(user_id, profile)
    }

    /// Current user's profile
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserInfo> {
        let user = sqlx::query_as::<_, UserInfo>(
            r#"
            SELECT id, name, email, phone, profile, last_access, created_at
            FROM users
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        Ok(user)
    }

    /// Issue an access/refresh token pair
    fn issue_tokens(&self, user_id: Uuid, profile: UserProfile) -> AppResult<AuthTokens> {
        let access_token = self.encode_token(user_id, profile, "access", self.access_token_expiry)?;
        let refresh_token =
            self.encode_token(user_id, profile, "refresh", self.refresh_token_expiry)?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn encode_token(
        &self,
        user_id: Uuid,
        profile: UserProfile,
        token_type: &str,
        expiry_seconds: i64,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            profile: profile.as_str().to_string(),
            token_type: token_type.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }
}
