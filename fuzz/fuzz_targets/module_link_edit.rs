#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use prodtree_pom::{DescriptorEditor, Transformation};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    descriptor: String,
    path: String,
    suppress: bool,
}

fuzz_target!(|input: FuzzInput| {
    let marker = "prodtree:excluded".to_owned();
    let transformation = if input.suppress {
        Transformation::SuppressModule {
            path: input.path,
            marker,
        }
    } else {
        Transformation::ActivateModule {
            path: input.path,
            marker,
        }
    };

    let mut editor = DescriptorEditor::from_text("fuzz/pom.xml", input.descriptor);
    editor.queue(transformation.clone());
    let Ok(first) = editor.render() else {
        return;
    };

    // 같은 편집을 다시 적용해도 결과가 바뀌지 않아야 함
    let mut again = DescriptorEditor::from_text("fuzz/pom.xml", first.clone());
    again.queue(transformation);
    if let Ok(second) = again.render() {
        assert_eq!(first, second);
    }
});
