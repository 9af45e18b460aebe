use super::*;

fn state(page: &Page, base_id: &str) -> Result<DisclosureState> {
    page.disclosure_state(base_id)
}

const COLLAPSED: DisclosureState = DisclosureState {
    content_shown: false,
    show_control_visible: Some(true),
    hide_control_visible: Some(false),
};

const EXPANDED: DisclosureState = DisclosureState {
    content_shown: true,
    show_control_visible: Some(false),
    hide_control_visible: Some(true),
};

#[test]
fn show_then_hide_restores_initial_state() -> Result<()> {
    let mut page = Page::from_html(REPORT_HTML)?;
    assert_eq!(state(&page, "t1")?, COLLAPSED);

    page.click("#t1-showlink")?;
    assert_eq!(state(&page, "t1")?, EXPANDED);
    assert!(state(&page, "t1")?.is_consistent());

    page.click("#t1-hidelink")?;
    assert_eq!(state(&page, "t1")?, COLLAPSED);
    Ok(())
}

#[test]
fn show_issues_one_fetch_for_the_current_query() -> Result<()> {
    let mut page = Page::from_html(REPORT_HTML)?;
    page.click("#t1-showlink")?;
    assert_eq!(page.take_fetch_calls(), vec!["/tap/detail?test=1"]);

    let pending = page.pending_fetches();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].url, "/tap/detail?test=1");
    assert_eq!(pending[0].base_id, "t1");
    assert_eq!(Some(pending[0].target), page.element_by_id("t1"));
    assert_eq!(pending[0].sequence, 1);
    Ok(())
}

#[test]
fn hide_does_not_touch_the_network() -> Result<()> {
    let mut page = Page::from_html(REPORT_HTML)?;
    page.click("#t1-hidelink")?;
    page.click("#t1-hidelink")?;
    assert!(page.take_fetch_calls().is_empty());
    assert_eq!(state(&page, "t1")?, COLLAPSED);
    Ok(())
}

#[test]
fn missing_query_attribute_fails_before_any_mutation() -> Result<()> {
    let mut page = Page::from_html(REPORT_HTML)?;
    let show = page.element_by_id("t1-showlink").ok_or(Error::SelectorNotFound("#t1-showlink".into()))?;
    page.remove_attribute(show, "data-query")?;

    let err = page.click("#t1-showlink");
    assert_eq!(
        err,
        Err(Error::MissingAttribute {
            id: "t1-showlink".into(),
            name: "data-query".into(),
        })
    );
    assert_eq!(state(&page, "t1")?, COLLAPSED);
    assert!(page.pending_fetches().is_empty());
    Ok(())
}

#[test]
fn missing_content_region_is_an_error_under_every_policy() -> Result<()> {
    let html = r#"
        <a id="gone-showlink" data-query="/x">show</a>
        <a id="gone-hidelink">hide</a>
    "#;
    for policy in [SiblingPolicy::Lenient, SiblingPolicy::Strict, SiblingPolicy::Legacy] {
        let config = DisclosureConfig::default().with_sibling_policy(policy);
        let mut page = Page::from_html_with_config(html, config)?;
        let missing = Err(Error::MissingElement { id: "gone".into() });
        assert_eq!(page.click("#gone-showlink"), missing, "{policy:?} show");
        assert_eq!(page.click("#gone-hidelink"), missing, "{policy:?} hide");
        assert!(page.pending_fetches().is_empty());
    }
    Ok(())
}

const NO_HIDE_CONTROL: &str = r#"
    <div id="r" style="display: none"></div>
    <a id="r-showlink" data-query="/r">show</a>
"#;

const NO_SHOW_CONTROL: &str = r#"
    <div id="r"></div>
    <a id="r-hidelink">hide</a>
"#;

#[test]
fn lenient_policy_skips_missing_controls_on_both_paths() -> Result<()> {
    let mut page = Page::from_html(NO_HIDE_CONTROL)?;
    page.click("#r-showlink")?;
    page.assert_displayed("#r", true)?;
    page.assert_displayed("#r-showlink", false)?;

    let mut page = Page::from_html(NO_SHOW_CONTROL)?;
    page.click("#r-hidelink")?;
    page.assert_displayed("#r", false)?;
    page.assert_displayed("#r-hidelink", false)?;
    Ok(())
}

#[test]
fn strict_policy_fails_both_paths_without_mutating() -> Result<()> {
    let config = DisclosureConfig::default().with_sibling_policy(SiblingPolicy::Strict);

    let mut page = Page::from_html_with_config(NO_HIDE_CONTROL, config.clone())?;
    assert_eq!(
        page.click("#r-showlink"),
        Err(Error::MissingElement { id: "r-hidelink".into() })
    );
    page.assert_displayed("#r", false)?;
    page.assert_displayed("#r-showlink", true)?;
    assert!(page.pending_fetches().is_empty());

    let mut page = Page::from_html_with_config(NO_SHOW_CONTROL, config)?;
    assert_eq!(
        page.click("#r-hidelink"),
        Err(Error::MissingElement { id: "r-showlink".into() })
    );
    page.assert_displayed("#r", true)?;
    page.assert_displayed("#r-hidelink", true)?;
    Ok(())
}

#[test]
fn legacy_policy_is_tolerant_on_show_and_strict_on_hide() -> Result<()> {
    let mut page = Page::from_html_with_config(NO_HIDE_CONTROL, DisclosureConfig::legacy())?;
    page.click("#r-showlink")?;
    page.assert_displayed("#r", true)?;
    page.assert_displayed("#r-showlink", false)?;

    let mut page = Page::from_html_with_config(NO_SHOW_CONTROL, DisclosureConfig::legacy())?;
    assert_eq!(
        page.click("#r-hidelink"),
        Err(Error::MissingElement { id: "r-showlink".into() })
    );
    // The content region was already hidden when the lookup failed.
    page.assert_displayed("#r", false)?;
    page.assert_displayed("#r-hidelink", true)?;
    Ok(())
}

#[test]
fn binding_recovers_members_replaced_after_attachment() -> Result<()> {
    let html = r#"
        <div id="wrap"><div id="r" style="display: none">old</div></div>
        <a id="r-showlink" data-query="/r">show</a>
        <a id="r-hidelink" style="display: none">hide</a>
    "#;
    let mut page = Page::from_html(html)?;
    let show = page.element_by_id("r-showlink").ok_or(Error::SelectorNotFound("#r-showlink".into()))?;
    let stale = page.element_by_id("r").ok_or(Error::SelectorNotFound("#r".into()))?;

    let wrap = page.element_by_id("wrap").ok_or(Error::SelectorNotFound("#wrap".into()))?;
    page.set_inner_html(wrap, r#"<section id="r" style="display: none"></section>"#)?;
    let fresh = page.element_by_id("r").ok_or(Error::SelectorNotFound("#r".into()))?;
    assert_ne!(stale, fresh);

    page.click_node(show)?;
    assert!(page.dom.is_displayed(fresh));
    let binding = page
        .disclosure_binding(show)
        .ok_or(Error::SelectorNotFound("binding".into()))?;
    assert_eq!(binding.content, Some(fresh));
    assert_eq!(page.pending_fetches()[0].target, fresh);
    Ok(())
}

#[test]
fn binding_picks_up_controls_created_after_attachment() -> Result<()> {
    let html = r#"
        <div id="r" style="display: none"></div>
        <p id="bar"><a id="r-showlink" data-query="/r">show</a></p>
    "#;
    let mut page = Page::from_html(html)?;
    let show = page.element_by_id("r-showlink").ok_or(Error::SelectorNotFound("#r-showlink".into()))?;
    assert_eq!(page.disclosure_binding(show).and_then(|b| b.hide), None);

    let bar = page.element_by_id("bar").ok_or(Error::SelectorNotFound("#bar".into()))?;
    page.append_html(bar, r#"<a id="r-hidelink" style="display: none">hide</a>"#)?;

    page.click_node(show)?;
    page.assert_displayed("#r-hidelink", true)?;
    let hide = page.element_by_id("r-hidelink");
    assert!(hide.is_some());
    assert_eq!(page.disclosure_binding(show).and_then(|b| b.hide), hide);
    Ok(())
}

#[test]
fn clicks_on_descendants_bubble_to_the_control() -> Result<()> {
    let html = r#"
        <div id="r" style="display: none"></div>
        <a id="r-showlink" data-query="/r"><span id="icon">+</span></a>
        <a id="r-hidelink" style="display: none">-</a>
    "#;
    let mut page = Page::from_html(html)?;
    page.click("#icon")?;
    assert_eq!(state(&page, "r")?, EXPANDED);
    Ok(())
}

#[test]
fn custom_click_handlers_replace_controllers() -> Result<()> {
    let mut page = Page::from_html(REPORT_HTML)?;
    let show = page.element_by_id("t1-showlink").ok_or(Error::SelectorNotFound("#t1-showlink".into()))?;
    page.on_click(show, |page, node| {
        page.set_attribute(node, "data-clicked", "yes")
    })?;

    page.click("#t1-showlink")?;
    assert_eq!(page.attribute(show, "data-clicked").as_deref(), Some("yes"));
    assert_eq!(page.controller_kind(show), None);
    assert_eq!(state(&page, "t1")?, COLLAPSED);
    Ok(())
}

#[test]
fn consistency_ignores_missing_controls() {
    let partial = DisclosureState {
        content_shown: true,
        show_control_visible: Some(false),
        hide_control_visible: None,
    };
    assert!(partial.is_consistent());

    let torn = DisclosureState {
        content_shown: false,
        show_control_visible: Some(true),
        hide_control_visible: Some(true),
    };
    assert!(!torn.is_consistent());
    assert!(COLLAPSED.is_consistent());
}

#[test]
fn disclosure_state_requires_the_content_region() -> Result<()> {
    let page = Page::from_html(REPORT_HTML)?;
    assert_eq!(
        page.disclosure_state("nope"),
        Err(Error::MissingElement { id: "nope".into() })
    );
    Ok(())
}
