//! Plain-text rendering of lists, details and form errors.
use chrono::{DateTime, Utc};
use newsdesk::collection::Page;
use newsdesk::forms::FieldErrors;
use newsdesk::models::{Article, Category, PreviewDraft};
use newsdesk::util::{
    display_width, excerpt, html_to_text, strip_control_chars, truncate_to_width, EXCERPT_CHARS,
};
use std::fmt::Write;

const ID_WIDTH: usize = 12;
const TITLE_WIDTH: usize = 40;
const CATEGORY_WIDTH: usize = 16;

/// Truncate then right-pad to exactly `width` columns.
fn cell(s: &str, width: usize) -> String {
    let clean = strip_control_chars(s);
    let cut = truncate_to_width(&clean, width);
    let pad = width.saturating_sub(display_width(&cut));
    format!("{}{}", cut, " ".repeat(pad))
}

fn date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// "Page 2/5 · items 11-20 of 42 · next: --page 3"
///
/// `narrowed` marks a server page that a local filter thinned out: the
/// counts are then the server's unfiltered ones and are labelled as such.
pub fn page_footer<T>(page: &Page<T>, narrowed: bool) -> String {
    if page.total_pages == 0 {
        return "No results".to_string();
    }
    let mut footer = format!("Page {}/{} · ", page.number, page.total_pages);
    if narrowed {
        let first = (page.number - 1) * page.page_size + 1;
        let last = (page.number * page.page_size).min(page.total_items);
        let _ = write!(
            footer,
            "items {first}-{last} of {} unfiltered · {} shown after filter",
            page.total_items,
            page.items.len()
        );
    } else {
        footer.push_str(&page.range_label());
    }
    if page.has_previous() {
        let _ = write!(footer, " · prev: --page {}", page.number - 1);
    }
    if page.has_next() {
        let _ = write!(footer, " · next: --page {}", page.number + 1);
    }
    footer
}

pub fn article_table(page: &Page<&Article>, category_options: &[String]) -> String {
    let mut out = format!(
        "{} {} {} {}\n",
        cell("ID", ID_WIDTH),
        cell("TITLE", TITLE_WIDTH),
        cell("CATEGORY", CATEGORY_WIDTH),
        "CREATED"
    );
    for article in &page.items {
        let _ = writeln!(
            out,
            "{} {} {} {}",
            cell(&article.id, ID_WIDTH),
            cell(&article.title, TITLE_WIDTH),
            cell(article.category.as_ref().map_or("-", |c| c.name.as_str()), CATEGORY_WIDTH),
            date(article.created_at)
        );
    }
    out.push_str(&page_footer(page, false));
    if !category_options.is_empty() {
        let _ = write!(out, "\nCategories: {}", category_options.join(", "));
    }
    out
}

pub fn category_table(page: &Page<&Category>, narrowed: bool) -> String {
    let mut out = format!(
        "{} {} {}\n",
        cell("ID", ID_WIDTH),
        cell("NAME", TITLE_WIDTH),
        "CREATED"
    );
    for category in &page.items {
        let _ = writeln!(
            out,
            "{} {} {}",
            cell(&category.id, ID_WIDTH),
            cell(&category.name, TITLE_WIDTH),
            date(category.created_at)
        );
    }
    out.push_str(&page_footer(page, narrowed));
    out
}

/// Reader list: one card per article with a short excerpt.
pub fn article_cards(page: &Page<&Article>) -> String {
    let mut out = String::new();
    for article in &page.items {
        let _ = writeln!(out, "{}", strip_control_chars(&article.title));
        let _ = writeln!(
            out,
            "  {} · {} · {}",
            date(article.created_at),
            article.category.as_ref().map_or("Uncategorized", |c| c.name.as_str()),
            article.id
        );
        let summary = excerpt(&article.content, EXCERPT_CHARS);
        if !summary.is_empty() {
            let _ = writeln!(out, "  {summary}");
        }
        out.push('\n');
    }
    out.push_str(&page_footer(page, false));
    out
}

pub fn article_detail(article: &Article) -> String {
    let mut out = format!("{}\n", strip_control_chars(&article.title));
    let _ = write!(out, "{}", date(article.created_at));
    if let Some(author) = article.author() {
        let _ = write!(out, " · by {}", strip_control_chars(author));
    }
    if let Some(category) = &article.category {
        let _ = write!(out, " · {}", strip_control_chars(&category.name));
    }
    out.push('\n');
    if let Some(url) = article.image_url.as_deref().filter(|u| !u.is_empty()) {
        let _ = writeln!(out, "Thumbnail: {url}");
    }
    let _ = write!(out, "\n{}", html_to_text(&article.content));
    out
}

pub fn recommendations(articles: &[Article]) -> String {
    if articles.is_empty() {
        return String::new();
    }
    let mut out = String::from("Other articles\n");
    for article in articles {
        let _ = writeln!(
            out,
            "  {} ({})",
            truncate_to_width(&strip_control_chars(&article.title), TITLE_WIDTH),
            article.id
        );
    }
    out
}

pub fn preview(draft: &PreviewDraft, category_name: &str) -> String {
    let mut out = format!("[PREVIEW · {}]\n", match &draft.id {
        Some(id) => format!("editing {id}"),
        None => "new article".to_string(),
    });
    let _ = writeln!(out, "{}", strip_control_chars(&draft.title));
    let _ = writeln!(out, "{} · Thumbnail: {}", strip_control_chars(category_name), draft.thumbnail);
    let _ = write!(out, "\n{}", html_to_text(&draft.content));
    out
}

pub fn field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("  {field}: {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}
