//! Authorization predicates for article mutations.

use uuid::Uuid;

use crate::models::{Role, User};

/// A user may create articles once they hold author access or better.
pub fn can_create(user: &User) -> bool {
    matches!(user.admin_status, Role::Author | Role::Admin)
}

/// A user may update or delete an article when they appear in its author
/// list, or when they are an admin. Callers must resolve existence first so
/// a missing article reports 404 before any 403.
pub fn can_mutate(user: &User, authors: &[Uuid]) -> bool {
    user.admin_status == Role::Admin || authors.contains(&user.id)
}

/// Pinning is an editorial decision reserved for admins, even on the
/// user's own articles.
pub fn can_pin(user: &User) -> bool {
    user.admin_status == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            name: "U".to_string(),
            password_hash: String::new(),
            admin_status: role,
            articles: vec![],
            personal_bio: None,
            linkedin_url: None,
            github_url: None,
            class_year: None,
            profile_picture_url: None,
        }
    }

    #[test]
    fn mutation_matrix() {
        let other = Uuid::new_v4();
        for role in [Role::User, Role::Author, Role::Admin] {
            let u = user(role);
            // listed as an author: always allowed
            assert!(can_mutate(&u, &[other, u.id]));
            // not listed: only admins may touch it
            assert_eq!(can_mutate(&u, &[other]), role == Role::Admin);
        }
    }

    #[test]
    fn creation_requires_author_access() {
        assert!(!can_create(&user(Role::User)));
        assert!(can_create(&user(Role::Author)));
        assert!(can_create(&user(Role::Admin)));
    }

    #[test]
    fn pinning_is_admin_only() {
        assert!(!can_pin(&user(Role::User)));
        assert!(!can_pin(&user(Role::Author)));
        assert!(can_pin(&user(Role::Admin)));
    }
}
