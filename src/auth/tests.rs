use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

fn token(secret: &str, sub: &str, role: &str, exp_offset_hours: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(exp_offset_hours)).timestamp()
            as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_role_parse_and_display() {
    assert_eq!("police".parse::<Role>().unwrap(), Role::Police);
    assert_eq!("Ambulance".parse::<Role>().unwrap(), Role::Ambulance);
    assert!("pilot".parse::<Role>().is_err());
    assert_eq!(Role::Fire.to_string(), "fire");
}

#[test]
fn test_role_serde_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Citizen).unwrap(), "\"citizen\"");
    let role: Role = serde_json::from_str("\"admin\"").unwrap();
    assert_eq!(role, Role::Admin);
}

#[tokio::test]
async fn test_jwt_verifier_accepts_valid_token() {
    let verifier = JwtVerifier::new("s3cret");
    let identity = verifier
        .verify(&token("s3cret", "r1", "ambulance", 1))
        .await
        .unwrap();
    assert_eq!(identity, Identity::new("r1", Role::Ambulance));
}

#[tokio::test]
async fn test_jwt_verifier_rejects_wrong_secret() {
    let verifier = JwtVerifier::new("s3cret");
    let err = verifier
        .verify(&token("other", "r1", "police", 1))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidToken);
}

#[tokio::test]
async fn test_jwt_verifier_rejects_expired_token() {
    let verifier = JwtVerifier::new("s3cret");
    let err = verifier
        .verify(&token("s3cret", "r1", "police", -2))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidToken);
}

#[tokio::test]
async fn test_jwt_verifier_rejects_unknown_role() {
    let verifier = JwtVerifier::new("s3cret");
    let err = verifier
        .verify(&token("s3cret", "r1", "pilot", 1))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::UnknownRole("pilot".to_string()));
}

#[tokio::test]
async fn test_jwt_verifier_rejects_garbage() {
    let verifier = JwtVerifier::new("s3cret");
    assert!(verifier.verify("invalid.token.here").await.is_err());
}

#[tokio::test]
async fn test_static_verifier() {
    let verifier = StaticVerifier::new().with("tok-p1", Identity::new("p1", Role::Police));
    assert_eq!(
        verifier.verify("tok-p1").await.unwrap(),
        Identity::new("p1", Role::Police)
    );
    assert_eq!(
        verifier.verify("tok-x").await.unwrap_err(),
        AuthError::InvalidToken
    );
}
