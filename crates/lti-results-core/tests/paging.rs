// crates/lti-results-core/tests/paging.rs
// ============================================================================
// Module: Paging Tests
// Description: Boundary arithmetic and navigation link rendering.
// Purpose: Pin page slices, offsets, and link headers for known inputs.
// Dependencies: lti-results-core
// ============================================================================
//! ## Overview
//! Covers the fixed paging arithmetic: seven graded records paged by three,
//! the last-page offset, out-of-range requests, empty sets, and the LTI 1.x
//! query ordering in generated links.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use lti_results_core::AuthorizationMode;
use lti_results_core::PageLinks;
use lti_results_core::PageRequest;
use lti_results_core::PageWindow;
use lti_results_core::PagingError;
use lti_results_core::TypeId;
use lti_results_core::paginate;
use lti_results_core::validate_paging_query_parameters;

use crate::common::graded;
use crate::common::graded_records;
use crate::common::ungraded;

const ENDPOINT: &str = "https://lms.example/lti/2/lineitems/7/results";

fn ids(page: &lti_results_core::Page) -> Vec<u64> {
    page.items.iter().map(|grade| grade.id).collect()
}

#[test]
fn seven_records_page_by_three() {
    let first = paginate(graded_records(7), PageRequest::paged(3, 0));
    let second = paginate(graded_records(7), PageRequest::paged(3, 3));
    let third = paginate(graded_records(7), PageRequest::paged(3, 6));

    assert_eq!(ids(&first), vec![0, 1, 2]);
    assert_eq!(ids(&second), vec![3, 4, 5]);
    assert_eq!(ids(&third), vec![6]);
    assert_eq!(third.total_count, 7);

    let window = third.window.expect("window");
    assert_eq!(window.prev_offset, Some(3));
    assert_eq!(window.next_offset, None);
}

#[test]
fn last_offset_is_total_minus_limit_plus_one() {
    assert_eq!(PageWindow::compute(7, 3, 0).last_offset, 5);
    assert_eq!(PageWindow::compute(10, 5, 0).last_offset, 6);
    assert_eq!(PageWindow::compute(2, 5, 0).last_offset, 0);
    assert_eq!(PageWindow::compute(4, 5, 0).last_offset, 0);
    assert_eq!(PageWindow::compute(5, 5, 0).last_offset, 1);
}

#[test]
fn prev_offset_clamps_at_zero() {
    let window = PageWindow::compute(10, 4, 2);
    assert_eq!(window.prev_offset, Some(0));
    assert_eq!(window.next_offset, Some(6));
}

#[test]
fn out_of_range_suppresses_prev_and_next_but_keeps_other_links() {
    let page = paginate(graded_records(7), PageRequest::paged(3, 9));
    assert!(page.items.is_empty());
    let window = page.window.expect("window");
    assert!(window.out_of_range);
    assert_eq!(window.prev_offset, None);
    assert_eq!(window.next_offset, None);

    let links = PageLinks::build(ENDPOINT, &AuthorizationMode::ToolProxy, &window);
    assert_eq!(links.first, format!("{ENDPOINT}?limit=3&from=0"));
    assert_eq!(links.canonical, format!("{ENDPOINT}?limit=3&from=9"));
    assert_eq!(links.last, format!("{ENDPOINT}?limit=3&from=5"));
    assert_eq!(links.prev, None);
    assert_eq!(links.next, None);
}

#[test]
fn offset_equal_to_total_is_out_of_range() {
    let window = PageWindow::compute(7, 3, 7);
    assert!(window.out_of_range);
}

#[test]
fn empty_graded_set_has_no_window() {
    let page = paginate(vec![ungraded(1), ungraded(2)], PageRequest::paged(3, 0));
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    assert!(page.window.is_none());
}

#[test]
fn unpaged_request_returns_every_graded_record_without_window() {
    let records = vec![graded(1), ungraded(2), graded(3), ungraded(4)];
    let page = paginate(records, PageRequest::unpaged());
    assert_eq!(ids(&page), vec![1, 3]);
    assert!(page.window.is_none());
}

#[test]
fn ungraded_records_do_not_shift_offsets() {
    let records = vec![ungraded(0), graded(1), ungraded(2), graded(3), graded(4)];
    let page = paginate(records, PageRequest::paged(2, 1));
    assert_eq!(ids(&page), vec![3, 4]);
    assert_eq!(page.total_count, 3);
}

#[test]
fn zero_time_modified_is_ungraded() {
    let mut record = graded(1);
    record.time_modified = Some(0);
    let page = paginate(vec![record], PageRequest::unpaged());
    assert!(page.items.is_empty());
}

#[test]
fn link_header_lists_relations_in_order() {
    let window = PageWindow::compute(7, 3, 3);
    let links = PageLinks::build(ENDPOINT, &AuthorizationMode::ToolProxy, &window);
    let expected = format!(
        "<{ENDPOINT}?limit=3&from=0>; rel=\"first\", <{ENDPOINT}?limit=3&from=0>; rel=\"prev\", \
         <{ENDPOINT}?limit=3&from=3>; rel=\"canonical\", <{ENDPOINT}?limit=3&from=6>; rel=\"next\", \
         <{ENDPOINT}?limit=3&from=5>; rel=\"last\""
    );
    assert_eq!(links.header_value(), expected);
}

#[test]
fn first_page_header_omits_prev() {
    let window = PageWindow::compute(7, 3, 0);
    let header = PageLinks::build(ENDPOINT, &AuthorizationMode::ToolProxy, &window).header_value();
    assert!(!header.contains("rel=\"prev\""));
    assert!(header.contains("rel=\"next\""));
}

#[test]
fn tool_type_links_put_typeid_first() {
    let mode = AuthorizationMode::ToolType(TypeId::new("5"));
    let window = PageWindow::compute(7, 3, 3);
    let links = PageLinks::build(ENDPOINT, &mode, &window);
    assert_eq!(links.canonical, format!("{ENDPOINT}?typeid=5&limit=3&from=3"));
    assert_eq!(links.last, format!("{ENDPOINT}?typeid=5&limit=3&from=5"));
}

#[test]
fn tool_type_links_encode_typeid() {
    let mode = AuthorizationMode::ToolType(TypeId::new("a b&c"));
    let window = PageWindow::compute(1, 1, 0);
    let links = PageLinks::build(ENDPOINT, &mode, &window);
    assert_eq!(links.first, format!("{ENDPOINT}?typeid=a+b%26c&limit=1&from=0"));
}

#[test]
fn validation_accepts_absent_parameters() {
    assert_eq!(validate_paging_query_parameters(None, None), Ok(PageRequest::unpaged()));
    assert_eq!(validate_paging_query_parameters(Some("3"), None), Ok(PageRequest::paged(3, 0)));
    assert_eq!(
        validate_paging_query_parameters(Some("3"), Some("6")),
        Ok(PageRequest::paged(3, 6))
    );
}

#[test]
fn validation_rejects_bad_limit() {
    assert_eq!(
        validate_paging_query_parameters(Some("0"), None),
        Err(PagingError::InvalidLimit("0".to_string()))
    );
    assert_eq!(
        validate_paging_query_parameters(Some("-2"), Some("1")),
        Err(PagingError::InvalidLimit("-2".to_string()))
    );
    assert_eq!(
        validate_paging_query_parameters(Some("ten"), None),
        Err(PagingError::InvalidLimit("ten".to_string()))
    );
}

#[test]
fn validation_checks_from_jointly_with_limit() {
    assert_eq!(
        validate_paging_query_parameters(None, Some("3")),
        Err(PagingError::FromWithoutLimit)
    );
    assert_eq!(
        validate_paging_query_parameters(Some("3"), Some("-1")),
        Err(PagingError::InvalidFrom("-1".to_string()))
    );
}
