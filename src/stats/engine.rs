//! Participation arithmetic over an in-memory snapshot of the registries.
//!
//! Nothing here touches storage. Audiences are always derived from the
//! members' current pole and status, so historical rates follow today's
//! membership.

use crate::database::models::{Attendance, AttendanceStatus, Meeting, Member, Pole};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;

pub const TOP_MEMBERS_LIMIT: usize = 5;
pub const GOOD_RATE: f64 = 70.0;
pub const FAIR_RATE: f64 = 50.0;
pub const AT_RISK_RATE: f64 = 50.0;
pub const AT_RISK_MIN_MEETINGS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MemberStats {
    pub total: usize,
    pub attended: usize,
    pub rate: f64,
    pub upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRanking {
    pub member_id: i64,
    pub discord_id: String,
    pub name: String,
    pub pole: Option<Pole>,
    pub stats: MemberStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoleStats {
    pub pole: Pole,
    pub members_count: usize,
    /// Mean of the individual member rates, each member weighted equally.
    pub average_member_engagement: f64,
    pub total_meetings: usize,
    pub upcoming_meetings: usize,
    pub top_members: Vec<MemberRanking>,
    /// Every active member of the pole, in registry order.
    pub members: Vec<MemberRanking>,
}

impl PoleStats {
    fn empty(pole: Pole) -> Self {
        PoleStats {
            pole,
            members_count: 0,
            average_member_engagement: 0.0,
            total_meetings: 0,
            upcoming_meetings: 0,
            top_members: Vec::new(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GlobalStats {
    pub active_members: usize,
    pub total_meetings: usize,
    pub upcoming_meetings: usize,
    /// Present rows over the summed expected audiences of every counted meeting.
    pub pooled_attendance_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeetingStats {
    pub present: usize,
    pub absent: usize,
    pub excused: usize,
    pub expected: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticipationTier {
    Good,
    Fair,
    Poor,
}

impl ParticipationTier {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= GOOD_RATE {
            ParticipationTier::Good
        } else if rate >= FAIR_RATE {
            ParticipationTier::Fair
        } else {
            ParticipationTier::Poor
        }
    }
}

/// `part / whole * 100`, or 0 when there is nothing to divide by.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

pub fn window_start(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    now - Duration::days(window_days.max(0))
}

/// Active members a meeting is meant for.
pub fn expected_audience<'a>(meeting: &Meeting, members: &'a [Member]) -> Vec<&'a Member> {
    members
        .iter()
        .filter(|member| member.is_active() && meeting.target_roles.includes(member.pole))
        .collect()
}

/// Counts the rows of one meeting. Rows of members missing from `members` are ignored.
pub fn compute_meeting_stats(
    meeting: &Meeting,
    attendances: &[Attendance],
    members: &[Member],
) -> MeetingStats {
    let known: HashSet<i64> = members.iter().map(|member| member.id).collect();
    let mut stats = MeetingStats::default();

    for attendance in attendances
        .iter()
        .filter(|a| a.meeting_id == meeting.id && known.contains(&a.member_id))
    {
        match attendance.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Excused => stats.excused += 1,
        }
    }

    stats.expected = expected_audience(meeting, members).len();
    stats.rate = percentage(stats.present, stats.expected);
    stats
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// All members in registry order, whatever their status.
    pub members: Vec<Member>,
    pub meetings: Vec<Meeting>,
    pub attendances: Vec<Attendance>,
    pub now: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        members: Vec<Member>,
        meetings: Vec<Meeting>,
        attendances: Vec<Attendance>,
        now: DateTime<Utc>,
    ) -> Self {
        Snapshot {
            members,
            meetings,
            attendances,
            now,
        }
    }

    fn active_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|member| member.is_active())
    }

    /// Completed and validated meetings dated within the window.
    fn finalized_in_window(&self, window_days: i64) -> impl Iterator<Item = &Meeting> {
        let since = window_start(self.now, window_days);
        let now = self.now;
        self.meetings
            .iter()
            .filter(move |meeting| meeting.is_finalized() && meeting.date >= since && meeting.date <= now)
    }

    fn relevant_finalized(&self, pole: Option<Pole>, window_days: i64) -> impl Iterator<Item = &Meeting> {
        self.finalized_in_window(window_days)
            .filter(move |meeting| meeting.target_roles.includes(pole))
    }

    fn upcoming(&self) -> impl Iterator<Item = &Meeting> {
        let now = self.now;
        self.meetings
            .iter()
            .filter(move |meeting| meeting.date >= now && !meeting.is_completed)
    }

    fn member_stats_for(&self, member: &Member, window_days: i64) -> MemberStats {
        let relevant: HashSet<i64> = self
            .relevant_finalized(member.pole, window_days)
            .map(|meeting| meeting.id)
            .collect();

        let attended = self
            .attendances
            .iter()
            .filter(|a| {
                a.member_id == member.id
                    && a.status == AttendanceStatus::Present
                    && relevant.contains(&a.meeting_id)
            })
            .count();

        let upcoming = self
            .upcoming()
            .filter(|meeting| meeting.target_roles.includes(member.pole))
            .count();

        MemberStats {
            total: relevant.len(),
            attended,
            rate: percentage(attended, relevant.len()),
            upcoming,
        }
    }

    fn ranking(&self, member: &Member, window_days: i64) -> MemberRanking {
        MemberRanking {
            member_id: member.id,
            discord_id: member.discord_id.clone(),
            name: member.display_name().to_string(),
            pole: member.pole,
            stats: self.member_stats_for(member, window_days),
        }
    }

    /// Participation of one member. Unknown members get zeroed stats.
    pub fn member_stats(&self, member_id: i64, window_days: i64) -> MemberStats {
        self.members
            .iter()
            .find(|member| member.id == member_id)
            .map(|member| self.member_stats_for(member, window_days))
            .unwrap_or_default()
    }

    pub fn pole_stats(&self, pole: Pole, window_days: i64) -> PoleStats {
        let members: Vec<MemberRanking> = self
            .active_members()
            .filter(|member| member.pole == Some(pole))
            .map(|member| self.ranking(member, window_days))
            .collect();

        if members.is_empty() {
            return PoleStats::empty(pole);
        }

        let rate_sum: f64 = members.iter().map(|ranking| ranking.stats.rate).sum();
        let average_member_engagement = rate_sum / members.len() as f64;

        let top_members = sorted_by_rate(members.clone())
            .into_iter()
            .take(TOP_MEMBERS_LIMIT)
            .collect();

        PoleStats {
            pole,
            members_count: members.len(),
            average_member_engagement,
            total_meetings: self.relevant_finalized(Some(pole), window_days).count(),
            upcoming_meetings: self
                .upcoming()
                .filter(|meeting| meeting.target_roles.includes(Some(pole)))
                .count(),
            top_members,
            members,
        }
    }

    pub fn global_stats(&self, window_days: i64) -> GlobalStats {
        let known: HashSet<i64> = self.members.iter().map(|member| member.id).collect();

        let mut total_meetings = 0;
        let mut expected = 0;
        let mut present = 0;

        for meeting in self.finalized_in_window(window_days) {
            total_meetings += 1;
            expected += expected_audience(meeting, &self.members).len();
            present += self
                .attendances
                .iter()
                .filter(|a| {
                    a.meeting_id == meeting.id
                        && a.status == AttendanceStatus::Present
                        && known.contains(&a.member_id)
                })
                .count();
        }

        GlobalStats {
            active_members: self.active_members().count(),
            total_meetings,
            upcoming_meetings: self.upcoming().count(),
            pooled_attendance_rate: percentage(present, expected),
        }
    }

    pub fn meeting_stats(&self, meeting_id: i64) -> Option<MeetingStats> {
        self.meetings
            .iter()
            .find(|meeting| meeting.id == meeting_id)
            .map(|meeting| compute_meeting_stats(meeting, &self.attendances, &self.members))
    }

    /// Active members who had at least one relevant meeting, best rate first.
    pub fn leaderboard(&self, window_days: i64) -> Vec<MemberRanking> {
        let rankings = self
            .active_members()
            .map(|member| self.ranking(member, window_days))
            .filter(|ranking| ranking.stats.total > 0)
            .collect();

        sorted_by_rate(rankings)
    }

    /// Leaderboard entries under the at-risk rate with enough meetings to judge.
    pub fn at_risk_members(&self, window_days: i64) -> Vec<MemberRanking> {
        self.leaderboard(window_days)
            .into_iter()
            .filter(|ranking| {
                ranking.stats.rate < AT_RISK_RATE && ranking.stats.total >= AT_RISK_MIN_MEETINGS
            })
            .collect()
    }

    /// Active members with no recorded activity for `since_days` days.
    pub fn inactive_members(&self, since_days: i64) -> Vec<&Member> {
        let threshold = window_start(self.now, since_days);
        self.active_members()
            .filter(|member| member.last_active < threshold)
            .collect()
    }
}

/// Stable: equal rates keep their registry order.
fn sorted_by_rate(mut rankings: Vec<MemberRanking>) -> Vec<MemberRanking> {
    rankings.sort_by(|a, b| b.stats.rate.total_cmp(&a.stats.rate));
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{MemberStatus, TargetRoles};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        "2026-03-15T12:00:00Z".parse().unwrap()
    }

    fn member(id: i64, name: &str, pole: Option<Pole>) -> Member {
        Member {
            id,
            discord_id: format!("{}", 1000 + id),
            username: name.to_lowercase(),
            full_name: Some(name.to_string()),
            email: None,
            pole,
            specialization: None,
            status: MemberStatus::Active,
            joined_at: now() - Duration::days(100),
            last_active: now() - Duration::days(1),
        }
    }

    fn meeting(id: i64, days_ago: i64, roles: TargetRoles, finalized: bool) -> Meeting {
        Meeting {
            id,
            title: format!("Meeting {id}"),
            description: None,
            date: now() - Duration::days(days_ago),
            created_by: "1".into(),
            organizer_id: None,
            target_roles: roles,
            is_completed: finalized,
            attendance_validated: finalized,
            validated_at: None,
            validated_by: None,
        }
    }

    fn poles(list: &[Pole]) -> TargetRoles {
        TargetRoles::Poles(list.iter().copied().collect::<BTreeSet<_>>())
    }

    fn row(id: i64, meeting_id: i64, member_id: i64, status: AttendanceStatus) -> Attendance {
        Attendance {
            id,
            meeting_id,
            member_id,
            status,
            timestamp: now(),
            recorded_by: None,
            modified_by: None,
            modified_at: None,
        }
    }

    #[test]
    fn member_attending_three_of_four_has_75_percent() {
        let members = vec![member(1, "Alice", Some(Pole::Dev))];
        let meetings = (1..=4)
            .map(|id| meeting(id, id * 3, poles(&[Pole::Dev]), true))
            .collect();
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 2, 1, AttendanceStatus::Present),
            row(3, 3, 1, AttendanceStatus::Present),
            row(4, 4, 1, AttendanceStatus::Absent),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let stats = snapshot.member_stats(1, 30);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.attended, 3);
        assert_eq!(stats.rate, 75.0);
    }

    #[test]
    fn member_without_meetings_has_zero_rate() {
        let snapshot = Snapshot::new(vec![member(1, "Alice", Some(Pole::Ia))], vec![], vec![], now());
        let stats = snapshot.member_stats(1, 30);
        assert_eq!(stats, MemberStats::default());
    }

    #[test]
    fn unknown_member_has_zeroed_stats() {
        let snapshot = Snapshot::new(vec![], vec![meeting(1, 2, TargetRoles::All, true)], vec![], now());
        assert_eq!(snapshot.member_stats(99, 30), MemberStats::default());
    }

    #[test]
    fn only_finalized_meetings_inside_the_window_count() {
        let members = vec![member(1, "Alice", Some(Pole::Dev))];
        let mut completed_not_validated = meeting(3, 5, TargetRoles::All, false);
        completed_not_validated.is_completed = true;
        let meetings = vec![
            meeting(1, 5, TargetRoles::All, true),
            meeting(2, 45, TargetRoles::All, true),
            completed_not_validated,
            meeting(4, 5, poles(&[Pole::Infra]), true),
        ];
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 2, 1, AttendanceStatus::Present),
            row(3, 3, 1, AttendanceStatus::Present),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let stats = snapshot.member_stats(1, 30);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.attended, 1);
        assert_eq!(stats.rate, 100.0);
    }

    #[test]
    fn member_without_pole_only_matches_all_meetings() {
        let members = vec![member(1, "Alice", None)];
        let meetings = vec![
            meeting(1, 2, TargetRoles::All, true),
            meeting(2, 2, poles(&[Pole::Dev, Pole::Ia, Pole::Infra]), true),
            meeting(3, -2, TargetRoles::All, false),
            meeting(4, -3, poles(&[Pole::Dev]), false),
        ];
        let snapshot = Snapshot::new(members, meetings, vec![], now());

        let stats = snapshot.member_stats(1, 30);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.upcoming, 1);
    }

    #[test]
    fn rate_stays_within_bounds() {
        let members = vec![member(1, "Alice", Some(Pole::Dev)), member(2, "Bob", Some(Pole::Dev))];
        let meetings = vec![
            meeting(1, 1, TargetRoles::All, true),
            meeting(2, 2, TargetRoles::All, true),
        ];
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 2, 1, AttendanceStatus::Present),
            row(3, 1, 2, AttendanceStatus::Excused),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        for id in [1, 2] {
            let rate = snapshot.member_stats(id, 30).rate;
            assert!((0.0..=100.0).contains(&rate), "rate {rate} out of bounds");
        }
    }

    #[test]
    fn meeting_for_two_poles_expects_both_poles() {
        let mut members: Vec<Member> = (1..=10)
            .map(|id| member(id, &format!("Dev {id}"), Some(Pole::Dev)))
            .collect();
        members.extend((11..=15).map(|id| member(id, &format!("Ia {id}"), Some(Pole::Ia))));
        members.push(member(16, "Infra", Some(Pole::Infra)));

        let target = meeting(1, 1, poles(&[Pole::Dev, Pole::Ia]), true);
        let attendances: Vec<Attendance> = (1..=9)
            .map(|id| row(id, 1, id, AttendanceStatus::Present))
            .collect();

        let stats = compute_meeting_stats(&target, &attendances, &members);
        assert_eq!(
            stats,
            MeetingStats {
                present: 9,
                absent: 0,
                excused: 0,
                expected: 15,
                rate: 60.0,
            }
        );
    }

    #[test]
    fn all_audience_equals_active_members() {
        let mut members = vec![
            member(1, "A", Some(Pole::Dev)),
            member(2, "B", None),
            member(3, "C", Some(Pole::Infra)),
        ];
        members[2].status = MemberStatus::Suspended;
        let target = meeting(1, 1, TargetRoles::All, false);

        assert_eq!(expected_audience(&target, &members).len(), 2);
    }

    #[test]
    fn orphaned_rows_are_ignored_by_meeting_stats() {
        let members = vec![member(1, "Alice", Some(Pole::Dev))];
        let target = meeting(1, 1, TargetRoles::All, true);
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 1, 42, AttendanceStatus::Present),
        ];

        let stats = compute_meeting_stats(&target, &attendances, &members);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.expected, 1);
        assert_eq!(stats.rate, 100.0);
    }

    #[test]
    fn meeting_stats_of_unknown_meeting_is_none() {
        let snapshot = Snapshot::new(vec![], vec![], vec![], now());
        assert!(snapshot.meeting_stats(7).is_none());
    }

    #[test]
    fn empty_pole_returns_zero_structure() {
        let snapshot = Snapshot::new(
            vec![member(1, "Alice", Some(Pole::Dev))],
            vec![meeting(1, 1, TargetRoles::All, true)],
            vec![],
            now(),
        );

        let stats = snapshot.pole_stats(Pole::Infra, 30);
        assert_eq!(stats.members_count, 0);
        assert_eq!(stats.average_member_engagement, 0.0);
        assert_eq!(stats.total_meetings, 0);
        assert!(stats.top_members.is_empty());
    }

    #[test]
    fn pole_average_is_mean_of_member_rates() {
        let members = vec![member(1, "Alice", Some(Pole::Dev)), member(2, "Bob", Some(Pole::Dev))];
        let meetings = (1..=4)
            .map(|id| meeting(id, id, poles(&[Pole::Dev]), true))
            .collect();
        let mut attendances: Vec<Attendance> = (1..=4)
            .map(|id| row(id, id, 1, AttendanceStatus::Present))
            .collect();
        attendances.push(row(5, 1, 2, AttendanceStatus::Present));
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let stats = snapshot.pole_stats(Pole::Dev, 30);
        assert_eq!(stats.members_count, 2);
        assert_eq!(stats.total_meetings, 4);
        assert_eq!(stats.average_member_engagement, 62.5);
        assert_eq!(stats.top_members[0].member_id, 1);
    }

    #[test]
    fn pole_average_differs_from_pooled_rate() {
        // Two DEV meetings attended by Alice only, plus an ALL meeting nobody attended.
        let members = vec![
            member(1, "Alice", Some(Pole::Dev)),
            member(2, "Bob", Some(Pole::Dev)),
            member(3, "Carol", Some(Pole::Ia)),
        ];
        let meetings = vec![
            meeting(1, 1, poles(&[Pole::Dev]), true),
            meeting(2, 2, poles(&[Pole::Dev]), true),
            meeting(3, 3, TargetRoles::All, true),
        ];
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 2, 1, AttendanceStatus::Present),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let pole = snapshot.pole_stats(Pole::Dev, 30);
        let global = snapshot.global_stats(30);

        // Alice 2/3, Bob 0/3 -> 33.3; pooled: 2 present over 2 + 2 + 3 expected.
        assert!((pole.average_member_engagement - 100.0 / 3.0).abs() < 1e-9);
        assert!((global.pooled_attendance_rate - 200.0 / 7.0).abs() < 1e-9);
        assert_eq!(global.total_meetings, 3);
        assert_eq!(global.active_members, 3);
    }

    #[test]
    fn top_members_sort_is_stable_and_truncated() {
        let members: Vec<Member> = (1..=7)
            .map(|id| member(id, &format!("M{id}"), Some(Pole::Ia)))
            .collect();
        let meetings = vec![meeting(1, 1, poles(&[Pole::Ia]), true)];
        // Members 3 and 6 attend; everyone else has rate 0.
        let attendances = vec![
            row(1, 1, 6, AttendanceStatus::Present),
            row(2, 1, 3, AttendanceStatus::Present),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let stats = snapshot.pole_stats(Pole::Ia, 30);
        let order: Vec<i64> = stats.top_members.iter().map(|r| r.member_id).collect();
        assert_eq!(order, vec![3, 6, 1, 2, 4]);
        assert_eq!(stats.members.len(), 7);
    }

    #[test]
    fn global_stats_on_empty_snapshot_is_zeroed() {
        let snapshot = Snapshot::new(vec![], vec![], vec![], now());
        assert_eq!(snapshot.global_stats(30), GlobalStats::default());
    }

    #[test]
    fn upcoming_counts_ignore_completed_and_past_meetings() {
        let members = vec![member(1, "Alice", Some(Pole::Dev))];
        let mut completed_future = meeting(3, -1, TargetRoles::All, false);
        completed_future.is_completed = true;
        let meetings = vec![
            meeting(1, -2, TargetRoles::All, false),
            meeting(2, -2, poles(&[Pole::Ia]), false),
            completed_future,
            meeting(4, 2, TargetRoles::All, false),
        ];
        let snapshot = Snapshot::new(members, meetings, vec![], now());

        assert_eq!(snapshot.global_stats(30).upcoming_meetings, 2);
        assert_eq!(snapshot.pole_stats(Pole::Dev, 30).upcoming_meetings, 1);
        assert_eq!(snapshot.member_stats(1, 30).upcoming, 1);
    }

    #[test]
    fn at_risk_requires_low_rate_and_two_meetings() {
        let members = vec![
            member(1, "Alice", Some(Pole::Dev)),
            member(2, "Bob", Some(Pole::Dev)),
            member(3, "Carol", Some(Pole::Ia)),
        ];
        let meetings = vec![
            meeting(1, 1, poles(&[Pole::Dev]), true),
            meeting(2, 2, poles(&[Pole::Dev]), true),
            meeting(3, 3, poles(&[Pole::Ia]), true),
        ];
        let attendances = vec![
            row(1, 1, 1, AttendanceStatus::Present),
            row(2, 2, 1, AttendanceStatus::Present),
        ];
        let snapshot = Snapshot::new(members, meetings, attendances, now());

        let leaderboard: Vec<i64> = snapshot.leaderboard(30).iter().map(|r| r.member_id).collect();
        assert_eq!(leaderboard, vec![1, 2, 3]);

        // Carol is at 0% but had a single meeting.
        let at_risk: Vec<i64> = snapshot.at_risk_members(30).iter().map(|r| r.member_id).collect();
        assert_eq!(at_risk, vec![2]);
    }

    #[test]
    fn inactive_members_use_last_activity() {
        let mut members = vec![member(1, "Alice", None), member(2, "Bob", None)];
        members[1].last_active = now() - Duration::days(20);
        let snapshot = Snapshot::new(members, vec![], vec![], now());

        let inactive: Vec<i64> = snapshot.inactive_members(14).iter().map(|m| m.id).collect();
        assert_eq!(inactive, vec![2]);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(ParticipationTier::from_rate(70.0), ParticipationTier::Good);
        assert_eq!(ParticipationTier::from_rate(69.9), ParticipationTier::Fair);
        assert_eq!(ParticipationTier::from_rate(50.0), ParticipationTier::Fair);
        assert_eq!(ParticipationTier::from_rate(0.0), ParticipationTier::Poor);
    }

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(9, 15), 60.0);
    }
}
