//! Required-field validation for the article, category and account forms.
//!
//! Validators are pure: they read the form and return a map of field name to
//! message. An empty map means the form may be submitted.
use crate::models::{Article, ArticleFields, Category, CategoryFields, Role};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Field name → message. Ordered so CLI output is stable.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Article Form
// ============================================================================

/// Thumbnail slot of the article form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Thumbnail {
    #[default]
    Missing,
    /// Already hosted; submitted as-is.
    Uploaded(String),
    /// Local file chosen but not yet uploaded.
    Pending(PathBuf),
}

impl Thumbnail {
    pub fn is_present(&self) -> bool {
        match self {
            Thumbnail::Missing => false,
            Thumbnail::Uploaded(url) => !url.trim().is_empty(),
            Thumbnail::Pending(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleForm {
    pub title: String,
    /// HTML body.
    pub content: String,
    pub category_id: Option<String>,
    pub thumbnail: Thumbnail,
}

impl ArticleForm {
    /// Pre-fill the edit form from an existing article.
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            category_id: article.category_ref_id().map(str::to_owned),
            thumbnail: article
                .image_url
                .clone()
                .filter(|u| !u.is_empty())
                .map_or(Thumbnail::Missing, Thumbnail::Uploaded),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !self.thumbnail.is_present() {
            errors.insert("thumbnail", "Choose a thumbnail".to_string());
        }
        if self.title.trim().is_empty() {
            errors.insert("title", "Enter title".to_string());
        }
        if self.category_id.as_deref().map_or(true, |c| c.trim().is_empty()) {
            errors.insert("category", "Select category".to_string());
        }
        errors
    }

    /// Build the wire payload once the thumbnail URL is known.
    pub fn to_fields(&self, image_url: String) -> ArticleFields {
        ArticleFields {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            category_id: self.category_id.clone().unwrap_or_default(),
            image_url,
        }
    }
}

// ============================================================================
// Category Form
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
}

impl CategoryForm {
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "Category name is required.".to_string());
        }
        errors
    }

    /// `user_id` is attached on create only.
    pub fn to_fields(&self, user_id: Option<String>) -> CategoryFields {
        CategoryFields {
            name: self.name.trim().to_string(),
            user_id,
        }
    }
}

// ============================================================================
// Account Forms
// ============================================================================

fn check_password(password: &SecretString, errors: &mut FieldErrors) {
    let len = password.expose_secret().chars().count();
    if len == 0 {
        errors.insert("password", "Password field cannot be empty".to_string());
    } else if len < MIN_PASSWORD_LEN {
        errors.insert(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
}

#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: SecretString,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.insert("username", "Username is required".to_string());
        }
        check_password(&self.password, &mut errors);
        errors
    }
}

#[derive(Debug)]
pub struct RegisterForm {
    pub username: String,
    pub password: SecretString,
    /// Raw role selection; must name a known [`Role`].
    pub role: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.insert("username", "Username field cannot be empty".to_string());
        }
        check_password(&self.password, &mut errors);
        if self.role().is_none() {
            errors.insert("role", "Please select a valid role".to_string());
        }
        errors
    }

    pub fn role(&self) -> Option<Role> {
        self.role.trim().parse().ok()
    }
}
