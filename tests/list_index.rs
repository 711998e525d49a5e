mod common;

use common::search_screen;
use phone_pilot::dom::SerializedNode;
use phone_pilot::resolver::find_by_list_index;
use phone_pilot::{TreeSerializer, UiNode};

fn list_record(records: &[SerializedNode]) -> &SerializedNode {
    records
        .iter()
        .find_map(|r| {
            if r.scroll {
                Some(r)
            } else {
                r.children.iter().find(|c| c.scroll)
            }
        })
        .expect("results list is serialized")
}

fn title(node: &UiNode) -> Option<&str> {
    node.walk().into_iter().find_map(|(_, n)| n.text())
}

#[test]
fn shown_index_resolves_back_to_the_same_row() {
    let root = search_screen();
    let records = TreeSerializer::default().compress(&root);
    let list = list_record(&records);
    assert_eq!(list.children.len(), 5);

    let mut checked = 0;
    for row in &list.children {
        let (Some(kind), Some(index)) = (row.kind, row.index) else {
            continue;
        };
        let path = find_by_list_index(&root, kind.as_str(), index)
            .unwrap_or_else(|| panic!("{} #{} not found", kind.as_str(), index));
        let shown = row.children.iter().find_map(|c| c.text.as_deref());
        assert_eq!(title(root.node_at(&path).unwrap()), shown);
        checked += 1;
    }
    assert_eq!(checked, 3);
}

#[test]
fn video_rows_are_typed_by_their_duration_child() {
    let root = search_screen();
    let records = TreeSerializer::default().compress(&root);
    let rows = &list_record(&records).children;

    let videos: Vec<_> = rows
        .iter()
        .filter(|r| r.kind.is_some_and(|k| k.as_str() == "video"))
        .map(|r| r.index)
        .collect();
    assert_eq!(videos, [Some(0), Some(1), Some(2)]);

    let path = find_by_list_index(&root, "video", 0).unwrap();
    assert_eq!(root.node_at(&path).unwrap().handle, 12);
    // Plain rows keep their own count.
    assert_eq!((rows[0].kind, rows[0].index), (None, Some(0)));
    assert_eq!((rows[2].kind, rows[2].index), (None, Some(1)));
}
