use serde::Deserialize;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Page size must be greater than zero")]
pub struct ZeroPageSize;

/// Where page slicing happens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PagingStrategy {
    /// Fetch the whole collection once, slice locally.
    #[default]
    #[serde(rename = "client")]
    ClientSide,
    /// Ask the server for each page.
    #[serde(rename = "server")]
    ServerSide,
}

/// `ceil(len / page_size)`; 0 for an empty collection.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        len.div_ceil(page_size)
    }
}

/// Items `[(page-1)*n, page*n)`, empty when out of range.
pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// 1-based page cursor with a fixed page size.
///
/// The cursor never leaves `[1, total_pages]`; with zero pages it rests on 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Result<Self, ZeroPageSize> {
        if page_size == 0 {
            return Err(ZeroPageSize);
        }
        Ok(Self { page_size, page: 1 })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn clamp(&mut self, total_items: usize) {
        let last = total_pages(total_items, self.page_size).max(1);
        self.page = self.page.clamp(1, last);
    }

    /// Set the page before the total is known, e.g. ahead of a server fetch.
    /// The next [`Paginator::clamp`] pulls it back into range.
    pub fn request(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn go_to(&mut self, page: usize, total_items: usize) {
        self.page = page;
        self.clamp(total_items);
    }

    /// Returns false when already on the last page.
    pub fn next(&mut self, total_items: usize) -> bool {
        if self.page < total_pages(total_items, self.page_size) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Returns false when already on the first page.
    pub fn previous(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Slice the current page out of an already-derived list.
    pub fn page_of<T: Clone>(&self, items: &[T]) -> Page<T> {
        Page {
            items: paginate(items, self.page_size, self.page).to_vec(),
            number: self.page,
            page_size: self.page_size,
            total_items: items.len(),
            total_pages: total_pages(items.len(), self.page_size),
        }
    }
}

/// One page of a list plus the numbers needed to render its navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.total_pages > 0 && self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// Numbered page buttons; empty when there are no pages.
    pub fn page_numbers(&self) -> RangeInclusive<usize> {
        1..=self.total_pages
    }

    /// "items 11-20 of 42", or "no items".
    pub fn range_label(&self) -> String {
        if self.total_items == 0 || self.items.is_empty() {
            return "no items".to_string();
        }
        let first = (self.number - 1) * self.page_size + 1;
        let last = first + self.items.len() - 1;
        format!("items {first}-{last} of {}", self.total_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
