use super::domain::TeamSummary;

/// Creation-time auto-draft policy.
///
/// An entry may skip coach review only when the owner runs exactly one team
/// for the entry's (sport, age group) pair and that team is the entry's
/// target. With two or more matching teams a human must choose, so the flag
/// stays off. The result is snapshotted onto the entry and never
/// re-evaluated.
pub fn eligible_for_auto_draft(owner_teams: &[TeamSummary], target: &TeamSummary) -> bool {
    let mut matches = owner_teams.iter().filter(|team| {
        team.sport.eq_ignore_ascii_case(&target.sport)
            && team.age_group.eq_ignore_ascii_case(&target.age_group)
    });

    match (matches.next(), matches.next()) {
        (Some(only), None) => only.team_id == target.team_id,
        _ => false,
    }
}
