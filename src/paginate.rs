use crate::models::{Page, PageItem};

// `page` is 1-based and must already be clamped to [1, total_pages] by the
// caller.
pub fn paginate<T>(records: &[T], page_size: usize, page: usize) -> Page<'_, T> {
    let total_pages = total_pages(records.len(), page_size);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(records.len());
    let items = if start >= records.len() {
        &records[0..0]
    } else {
        &records[start..end]
    };

    Page {
        items,
        page,
        total_pages,
    }
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Condensed page-number strip: five or fewer pages show everything, beyond
/// that only 1, the last page, and the current page's neighborhood survive.
pub fn page_items(total: usize, current: usize) -> Vec<PageItem> {
    if total <= 5 {
        return (1..=total).map(PageItem::Number).collect();
    }

    let mut shown: Vec<usize> = [
        1,
        total,
        current.saturating_sub(1),
        current,
        current + 1,
    ]
    .into_iter()
    .filter(|page| (1..=total).contains(page))
    .collect();
    shown.sort_unstable();
    shown.dedup();

    let mut items = Vec::with_capacity(shown.len() + 2);
    let mut previous: Option<usize> = None;
    for page in shown {
        if let Some(prev) = previous {
            if page - prev > 1 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.push(PageItem::Number(page));
        previous = Some(page);
    }
    items
}
