//! Owner-only mutation of board posts

use bson::oid::ObjectId;
use tracing::warn;

use crate::auth::jwt::IdentityClaim;
use crate::db::schemas::PostDoc;
use crate::store::PostStore;
use crate::types::GatewayError;

/// Allow a mutation only when the claim's subject authored the post
pub fn authorize_mutation(claim: &IdentityClaim, post: &PostDoc) -> Result<(), GatewayError> {
    if claim.subject_id == post.owner_id() {
        Ok(())
    } else {
        warn!(
            user_id = %claim.subject_id,
            owner_id = %post.owner_id(),
            "Mutation denied: not the author"
        );
        Err(GatewayError::Forbidden("only the author may modify this post".into()))
    }
}

/// Parse a post ID from a path segment. Malformed IDs cannot exist, so they are not found.
pub fn parse_post_id(raw: &str) -> Result<ObjectId, GatewayError> {
    Ok(ObjectId::parse_str(raw)?)
}

/// Load a post for mutation: existence is checked before ownership
pub async fn load_owned_post(
    posts: &dyn PostStore,
    raw_id: &str,
    claim: &IdentityClaim,
) -> Result<(ObjectId, PostDoc), GatewayError> {
    let id = parse_post_id(raw_id)?;
    let post = posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("post".into()))?;

    authorize_mutation(claim, &post)?;
    Ok((id, post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPostStore;

    fn post_by(author: ObjectId) -> PostDoc {
        PostDoc::new("t".into(), "c".into(), author, "notice".into())
    }

    #[test]
    fn test_owner_allowed_other_forbidden() {
        let owner = ObjectId::new();
        let post = post_by(owner);

        let a = IdentityClaim::new(owner.to_hex(), "a");
        let b = IdentityClaim::new(ObjectId::new().to_hex(), "b");

        assert!(authorize_mutation(&a, &post).is_ok());
        assert!(matches!(
            authorize_mutation(&b, &post),
            Err(GatewayError::Forbidden(_))
        ));
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(
            parse_post_id("not-an-object-id"),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_not_found_before_forbidden() {
        let store = MemoryPostStore::new();
        let stranger = IdentityClaim::new(ObjectId::new().to_hex(), "s");

        let missing = ObjectId::new().to_hex();
        let err = load_owned_post(&store, &missing, &stranger).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let saved = store.insert(post_by(ObjectId::new())).await.unwrap();
        let id = saved._id.unwrap().to_hex();
        let err = load_owned_post(&store, &id, &stranger).await.unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }
}
