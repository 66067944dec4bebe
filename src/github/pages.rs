// Cursor pagination over link-header APIs.
// Extracts the next page number from a response's `link` header and walks
// a paged fetch operation until the cursor runs out or a limit is reached.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// Matches one `<url>; rel="name"` entry carrying a `page` query parameter.
static LINK_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>;\s*rel="([^"]*)""#).unwrap());

/// Split a raw `gh api -i` response into its header block and body.
pub fn split_response(raw: &str) -> (&str, &str) {
    raw.split_once("\r\n\r\n")
        .or_else(|| raw.split_once("\n\n"))
        .unwrap_or((raw, ""))
}

/// Extract the next page number from a response header block.
///
/// Locates the `link` header (status line skipped, name case-insensitive)
/// and parses the page number of the entry tagged `rel="next"`. Absence of
/// the header or the entry yields -1.
pub fn next_page(headers: &str) -> i64 {
    for (i, line) in headers.lines().enumerate() {
        if i == 0 {
            continue; // status line
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("link") {
            continue;
        }
        for capture in LINK_ENTRY.captures_iter(value) {
            if &capture[2] == "next" {
                return capture[1].parse().unwrap_or(-1);
            }
        }
        return -1;
    }
    -1
}

/// Walk a paged fetch to completion or until `limit` items are accumulated.
///
/// `fetch` takes a 1-based page number and returns the next page cursor
/// (-1 for none) and that page's items. Fetching starts at page 1 and
/// continues while the accumulator holds fewer than `limit` items and the
/// cursor points at a further page. The result may exceed `limit` by up to
/// one page; nothing is truncated. An empty page with a live cursor does
/// not terminate the walk — only the cursor does.
pub fn walk<T, F>(limit: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(i64) -> Result<(i64, Vec<T>)>,
{
    let (mut next, mut items) = fetch(1)?;
    while next > 0 && items.len() < limit {
        let (cursor, page) = fetch(next)?;
        next = cursor;
        items.extend(page);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &str = "HTTP/2.0 200 OK\n\
        Content-Type: application/json; charset=utf-8\n\
        Link: <https://api.github.com/repositories/1/actions/runs?status=completed&page=2&per_page=100>; rel=\"next\", \
        <https://api.github.com/repositories/1/actions/runs?status=completed&page=9&per_page=100>; rel=\"last\"";

    #[test]
    fn test_next_page_parses_rel_next() {
        assert_eq!(next_page(HEADERS), 2);
    }

    #[test]
    fn test_next_page_absent_yields_negative_one() {
        let headers = "HTTP/2.0 200 OK\nContent-Type: application/json";
        assert_eq!(next_page(headers), -1);

        let last_only = "HTTP/2.0 200 OK\nLink: <https://x?page=9&n=1>; rel=\"last\"";
        assert_eq!(next_page(last_only), -1);
    }

    #[test]
    fn test_next_page_ignores_status_line() {
        // A pathological status line must not be read as a header.
        let headers = "link: <https://x?page=5&n=1>; rel=\"next\"\nContent-Type: text/plain";
        assert_eq!(next_page(headers), -1);
    }

    #[test]
    fn test_split_response_on_blank_line() {
        let raw = "HTTP/2.0 200 OK\r\nLink: none\r\n\r\n{\"a\": 1}";
        let (headers, body) = split_response(raw);
        assert!(headers.starts_with("HTTP/2.0"));
        assert_eq!(body, "{\"a\": 1}");
    }

    #[test]
    fn test_walk_stops_on_exhausted_cursor() {
        let mut fetches = 0;
        let items = walk(10, |page| {
            fetches += 1;
            match page {
                1 => Ok((2, vec!["a"])),
                2 => Ok((-1, vec!["b"])),
                _ => panic!("unexpected page {page}"),
            }
        })
        .unwrap();

        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(fetches, 2);
    }

    #[test]
    fn test_walk_overfetches_past_limit() {
        // Pages of 3 with limit 5: two pages are fetched, all 6 items kept.
        let mut fetches = 0;
        let items = walk(5, |page| {
            fetches += 1;
            Ok((page + 1, vec![0u64, 1, 2]))
        })
        .unwrap();

        assert_eq!(items.len(), 6);
        assert_eq!(fetches, 2);
    }

    #[test]
    fn test_walk_continues_through_empty_page() {
        let items = walk(10, |page| match page {
            1 => Ok((2, Vec::<u64>::new())),
            2 => Ok((-1, vec![7])),
            _ => panic!("unexpected page {page}"),
        })
        .unwrap();

        assert_eq!(items, vec![7]);
    }

    #[test]
    fn test_walk_single_page() {
        let items = walk(10, |_| Ok((-1, vec![1u64, 2]))).unwrap();
        assert_eq!(items, vec![1, 2]);
    }
}
