#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use prodtree_core::{Ga, GavPattern, GavSet};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    include: String,
    exclude: String,
    group_id: String,
    artifact_id: String,
    version: Option<String>,
}

fuzz_target!(|input: FuzzInput| {
    if let Ok(pattern) = GavPattern::parse(&input.include) {
        let _ = pattern.matches(&input.group_id, &input.artifact_id, input.version.as_deref());
        let _ = pattern.matches_ga(&Ga::new(&input.group_id, &input.artifact_id));
    }

    // exclude가 매칭하면 include와 무관하게 제외되어야 함
    if let Ok(set) = GavSet::parse(&[input.include.as_str()], &[input.exclude.as_str()]) {
        let contained = set.contains(&input.group_id, &input.artifact_id, input.version.as_deref());
        if let Ok(exclude) = GavPattern::parse(&input.exclude) {
            if exclude.matches(&input.group_id, &input.artifact_id, input.version.as_deref()) {
                assert!(!contained, "exclude must win: {input:?}");
            }
        }
    }
});
