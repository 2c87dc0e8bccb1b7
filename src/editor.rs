use crate::host::{HostSurface, NodeId, Selector};

pub const EDITOR_MARKER: &str = "data-sql-editor";

/// Lookup strategies for the host's SQL input, tried in order.
pub const EDITOR_SELECTORS: [Selector<'static>; 2] = [
    Selector::AttributeEquals {
        tag: "textarea",
        name: "name",
        value: "sql",
    },
    Selector::Marked {
        tag: "textarea",
        marker: EDITOR_MARKER,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorHandle(pub NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormHandle(pub NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Submitted,
}

pub fn locate_editor<H: HostSurface + ?Sized>(host: &H) -> Option<EditorHandle> {
    EDITOR_SELECTORS
        .iter()
        .find_map(|selector| host.query(selector))
        .map(EditorHandle)
}

/// Walks up from the editor to the nearest `form`, stopping at the root.
pub fn locate_form<H: HostSurface + ?Sized>(host: &H, editor: EditorHandle) -> Option<FormHandle> {
    let mut current = Some(editor.0);
    while let Some(node) = current {
        if host.is_root(node) {
            return None;
        }
        if host.tag_name(node).as_deref() == Some("form") {
            return Some(FormHandle(node));
        }
        current = host.parent(node);
    }
    None
}

/// Always writes; submits only when asked and a form exists.
pub fn write_and_maybe_submit<H: HostSurface + ?Sized>(
    host: &mut H,
    editor: EditorHandle,
    form: Option<FormHandle>,
    text: &str,
    should_submit: bool,
) -> WriteOutcome {
    host.set_text(editor.0, text);
    match form {
        Some(form) if should_submit => {
            host.submit(form.0);
            WriteOutcome::Submitted
        }
        _ => WriteOutcome::Written,
    }
}

#[cfg(test)]
mod tests {
    use super::{locate_editor, locate_form, write_and_maybe_submit, FormHandle, WriteOutcome};
    use crate::host::page::Page;
    use crate::host::HostSurface;

    #[test]
    fn named_textarea_wins_over_marked_one() {
        let mut page = Page::new("/mydb");
        let root = page.root();
        page.append(root, "textarea", &[("data-sql-editor", "")]);
        let named = page.append(root, "textarea", &[("name", "sql")]);

        let editor = locate_editor(&page).expect("editor should be found");
        assert_eq!(editor.0, named);
    }

    #[test]
    fn falls_back_to_marked_textarea() {
        let page = Page::for_location("/mydb/people");
        assert!(locate_editor(&page).is_some());
    }

    #[test]
    fn missing_editor_is_none() {
        let page = Page::for_location("/");
        assert!(locate_editor(&page).is_none());
    }

    #[test]
    fn form_found_through_intermediate_wrapper() {
        let page = Page::for_location("/mydb/people");
        let editor = locate_editor(&page).expect("editor");
        let form = locate_form(&page, editor).expect("form");
        assert_eq!(page.tag_name(form.0).as_deref(), Some("form"));
    }

    #[test]
    fn editor_outside_any_form_has_no_form() {
        let mut page = Page::new("/mydb");
        let root = page.root();
        let wrapper = page.append(root, "div", &[]);
        page.append(wrapper, "textarea", &[("name", "sql")]);

        let editor = locate_editor(&page).expect("editor");
        assert!(locate_form(&page, editor).is_none());
    }

    #[test]
    fn write_without_form_still_writes_and_skips_submit() {
        let mut page = Page::new("/mydb");
        let root = page.root();
        let textarea = page.append(root, "textarea", &[("name", "sql")]);
        let editor = locate_editor(&page).expect("editor");

        let outcome = write_and_maybe_submit(&mut page, editor, None, "select 1", true);
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(page.text(textarea).as_deref(), Some("select 1"));
        assert!(page.take_submissions().is_empty());
    }

    #[test]
    fn write_with_form_submits_only_when_asked() {
        let mut page = Page::for_location("/mydb/-/query");
        let editor = locate_editor(&page).expect("editor");
        let form: Option<FormHandle> = locate_form(&page, editor);

        let outcome = write_and_maybe_submit(&mut page, editor, form, "select 1", false);
        assert_eq!(outcome, WriteOutcome::Written);
        assert!(page.take_submissions().is_empty());

        let outcome = write_and_maybe_submit(&mut page, editor, form, "select 2", true);
        assert_eq!(outcome, WriteOutcome::Submitted);
        let submissions = page.take_submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].sql(), Some("select 2"));
    }
}
