use lazy_disclosure::{
    DisclosureConfig, DisclosureState, Error, FetchResponse, Page, ResponseOrdering, Result,
};

const REPORT_HTML: &str = r##"
    <div class="test-result">
      <span>ok 42 - report renders</span>
      <a id="case42-showlink" href="#" data-query="/report?id=42">Show details</a>
      <a id="case42-hidelink" href="#" style="display: none">Hide details</a>
      <div id="case42" style="display: none"></div>
    </div>
"##;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn collapsed() -> DisclosureState {
    DisclosureState {
        content_shown: false,
        show_control_visible: Some(true),
        hide_control_visible: Some(false),
    }
}

#[test]
fn show_then_hide_returns_every_element_to_its_initial_state() -> Result<()> {
    init_logging();
    let mut page = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    let before = page.disclosure_state("case42")?;
    assert_eq!(before, collapsed());

    page.click("#case42-showlink")?;
    page.assert_displayed("#case42", true)?;
    page.assert_displayed("#case42-showlink", false)?;
    page.assert_displayed("#case42-hidelink", true)?;

    page.click("#case42-hidelink")?;
    assert_eq!(page.disclosure_state("case42")?, before);
    Ok(())
}

#[test]
fn hiding_twice_matches_hiding_once() -> Result<()> {
    init_logging();
    let mut once = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    once.click("#case42-showlink")?;
    once.click("#case42-hidelink")?;

    let mut twice = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    twice.click("#case42-showlink")?;
    twice.click("#case42-hidelink")?;
    twice.click("#case42-hidelink")?;

    assert_eq!(once.disclosure_state("case42")?, twice.disclosure_state("case42")?);
    assert_eq!(once.dump_dom(".test-result")?, twice.dump_dom(".test-result")?);
    Ok(())
}

#[test]
fn showing_fetches_the_query_once_and_injects_the_body() -> Result<()> {
    init_logging();
    let mut page = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    page.set_fetch_mock("/report?id=42", "<div>ok</div>");

    page.click("#case42-showlink")?;
    assert_eq!(page.take_fetch_calls(), vec!["/report?id=42"]);
    page.assert_inner_html("#case42", "")?;

    page.flush()?;
    page.assert_inner_html("#case42", "<div>ok</div>")?;
    assert!(page.take_fetch_calls().is_empty());
    Ok(())
}

#[test]
fn show_tolerates_a_missing_hide_control() -> Result<()> {
    init_logging();
    let html = r#"
        <a id="solo-showlink" data-query="/solo">Show</a>
        <div id="solo" style="display: none"></div>
    "#;
    let mut page = Page::from_html_with_config(html, DisclosureConfig::legacy())?;
    page.click("#solo-showlink")?;
    page.assert_displayed("#solo", true)?;
    page.assert_displayed("#solo-showlink", false)?;
    Ok(())
}

#[test]
fn hide_fails_when_the_show_control_is_missing() -> Result<()> {
    init_logging();
    let html = r#"
        <a id="solo-hidelink">Hide</a>
        <div id="solo"></div>
    "#;
    let mut page = Page::from_html_with_config(html, DisclosureConfig::legacy())?;
    match page.click("#solo-hidelink") {
        Err(Error::MissingElement { id }) => assert_eq!(id, "solo-showlink"),
        other => panic!("expected missing show control, got {other:?}"),
    }
    Ok(())
}

#[test]
fn each_activation_reads_the_current_query() -> Result<()> {
    init_logging();
    let mut page = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    page.click("#case42-showlink")?;
    page.click("#case42-hidelink")?;

    let show = page
        .element_by_id("case42-showlink")
        .ok_or_else(|| Error::SelectorNotFound("#case42-showlink".into()))?;
    page.set_attribute(show, "data-query", "/report?id=43")?;
    page.click("#case42-showlink")?;

    assert_eq!(page.take_fetch_calls(), vec!["/report?id=42", "/report?id=43"]);
    Ok(())
}

#[test]
fn arrival_order_lets_a_stale_response_overwrite_a_newer_one() -> Result<()> {
    init_logging();
    let mut page = Page::from_html_with_config(REPORT_HTML, DisclosureConfig::legacy())?;
    page.click("#case42-showlink")?;
    page.click("#case42-showlink")?;
    let pending = page.pending_fetches();
    let (a, b) = (pending[0].id, pending[1].id);

    page.complete_fetch(b, FetchResponse::ok("<p>B</p>"))?;
    page.complete_fetch(a, FetchResponse::ok("<p>A</p>"))?;
    // Current behaviour under arrival ordering, not a correctness guarantee.
    page.assert_inner_html("#case42", "<p>A</p>")?;
    Ok(())
}

#[test]
fn sequenced_order_keeps_the_newest_request() -> Result<()> {
    init_logging();
    let config = DisclosureConfig::legacy().with_response_ordering(ResponseOrdering::Sequenced);
    let mut page = Page::from_html_with_config(REPORT_HTML, config)?;
    page.click("#case42-showlink")?;
    page.click("#case42-showlink")?;
    let pending = page.pending_fetches();
    let (a, b) = (pending[0].id, pending[1].id);

    assert!(page.complete_fetch(b, FetchResponse::ok("<p>B</p>"))?);
    assert!(!page.complete_fetch(a, FetchResponse::ok("<p>A</p>"))?);
    page.assert_inner_html("#case42", "<p>B</p>")?;
    Ok(())
}

#[test]
fn hung_requests_leave_the_region_untouched() -> Result<()> {
    init_logging();
    let html = r#"
        <a id="slow-showlink" data-query="/slow">Show</a>
        <a id="slow-hidelink" style="display: none">Hide</a>
        <div id="slow" style="display: none">Loading...</div>
    "#;
    let mut page = Page::from_html(html)?;
    page.click("#slow-showlink")?;
    page.flush()?;

    page.assert_displayed("#slow", true)?;
    page.assert_text("#slow", "Loading...")?;
    assert_eq!(page.pending_fetches().len(), 1);
    Ok(())
}

#[test]
fn failures_in_one_pair_do_not_affect_others() -> Result<()> {
    init_logging();
    let html = r#"
        <a id="broken-hidelink">Hide</a>
        <div id="broken"></div>
        <a id="fine-showlink" data-query="/fine">Show</a>
        <a id="fine-hidelink" style="display: none">Hide</a>
        <div id="fine" style="display: none"></div>
    "#;
    let mut page = Page::from_html_with_config(html, DisclosureConfig::legacy())?;
    page.set_fetch_mock("/fine", "fine");
    assert!(page.click("#broken-hidelink").is_err());

    page.click("#fine-showlink")?;
    page.flush()?;
    page.assert_text("#fine", "fine")?;
    page.click("#fine-hidelink")?;
    page.assert_displayed("#fine", false)?;
    Ok(())
}
