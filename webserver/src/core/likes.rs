//! Like toggling

use shared::{AuthUser, LikeOutcome, ServiceId, service_debug};

use crate::error::{WebServerError, WebServerResult};
use crate::traits::BackendService;

/// Counter after a toggle; never below zero
pub fn next_like_count(current: i64, liked_before: bool) -> i64 {
    if liked_before {
        (current - 1).max(0)
    } else {
        current.max(0) + 1
    }
}

/// Add the user's like if absent, remove it otherwise, then write the new
/// counter back to the prompt
pub async fn toggle_like<B>(backend: &B, user: &AuthUser, prompt_id: i64) -> WebServerResult<LikeOutcome>
where
    B: BackendService + ?Sized,
{
    let prompt = backend
        .get_prompt(prompt_id)
        .await?
        .ok_or_else(|| WebServerError::NotFound(format!("prompt {prompt_id}")))?;

    let liked_before = backend.has_like(user.id, prompt_id).await?;
    if liked_before {
        backend.remove_like(user.id, prompt_id).await?;
    } else {
        backend.add_like(user.id, prompt_id).await?;
    }

    let likes = next_like_count(prompt.likes, liked_before);
    backend.update_likes(prompt_id, likes).await?;
    service_debug!(ServiceId::current(), prompt_id, likes, liked = !liked_before, "Like toggled");

    Ok(LikeOutcome { liked: !liked_before, likes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockBackendService;
    use mockall::predicate::eq;
    use shared::PublishedPrompt;
    use uuid::Uuid;

    fn prompt(likes: i64) -> PublishedPrompt {
        PublishedPrompt {
            id: 5,
            title: "t".into(),
            content: "c".into(),
            description: None,
            category: None,
            author_id: None,
            image_url: None,
            likes,
            is_public: true,
            created_at: None,
            author: None,
        }
    }

    fn user() -> AuthUser {
        AuthUser { id: Uuid::nil(), email: None }
    }

    #[test]
    fn test_next_like_count() {
        assert_eq!(next_like_count(3, false), 4);
        assert_eq!(next_like_count(3, true), 2);
        assert_eq!(next_like_count(0, true), 0);
        assert_eq!(next_like_count(-2, false), 1);
    }

    #[tokio::test]
    async fn test_like_is_added() {
        let mut backend = MockBackendService::new();
        backend.expect_get_prompt().with(eq(5)).returning(|_| Ok(Some(prompt(2))));
        backend.expect_has_like().returning(|_, _| Ok(false));
        backend.expect_add_like().times(1).returning(|_, _| Ok(()));
        backend.expect_remove_like().never();
        backend
            .expect_update_likes()
            .with(eq(5), eq(3))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = toggle_like(&backend, &user(), 5).await.unwrap();
        assert_eq!(outcome, LikeOutcome { liked: true, likes: 3 });
    }

    #[tokio::test]
    async fn test_like_is_removed_and_floored() {
        let mut backend = MockBackendService::new();
        backend.expect_get_prompt().returning(|_| Ok(Some(prompt(0))));
        backend.expect_has_like().returning(|_, _| Ok(true));
        backend.expect_remove_like().times(1).returning(|_, _| Ok(()));
        backend.expect_add_like().never();
        backend
            .expect_update_likes()
            .with(eq(5), eq(0))
            .returning(|_, _| Ok(()));

        let outcome = toggle_like(&backend, &user(), 5).await.unwrap();
        assert_eq!(outcome, LikeOutcome { liked: false, likes: 0 });
    }

    #[tokio::test]
    async fn test_unknown_prompt_is_not_found() {
        let mut backend = MockBackendService::new();
        backend.expect_get_prompt().returning(|_| Ok(None));
        backend.expect_has_like().never();

        let err = toggle_like(&backend, &user(), 99).await.unwrap_err();
        assert!(matches!(err, WebServerError::NotFound(_)));
    }
}
