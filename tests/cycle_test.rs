//! Tests for the reference cycle guard

use rstest::rstest;

use techtree::domain::{detect_cycle, ReferenceChain, Technology, TechnologyId};

#[rstest]
#[case::self_reference(&[1], 1, true)]
#[case::other_technology(&[1], 2, false)]
#[case::grown_chain_hit(&[1, 2, 3], 3, true)]
#[case::grown_chain_miss(&[1, 2, 3], 4, false)]
fn given_chain_when_detecting_cycle_then_reports_membership(
    #[case] chain: &[u64],
    #[case] referenced: u64,
    #[case] expected: bool,
) {
    let chain: ReferenceChain = chain.iter().copied().map(TechnologyId).collect();
    let technology = Technology::new(TechnologyId(referenced), "T", None);

    assert_eq!(detect_cycle(&chain, &technology), expected);
}

#[test]
fn given_detection_when_called_then_chain_is_not_grown() {
    let chain = ReferenceChain::starting_at(TechnologyId(1));
    let other = Technology::new(TechnologyId(2), "T-2", None);

    assert!(!detect_cycle(&chain, &other));
    assert!(!detect_cycle(&chain, &other));

    assert_eq!(chain.len(), 1);
    assert!(!chain.contains(TechnologyId(2)));
}
