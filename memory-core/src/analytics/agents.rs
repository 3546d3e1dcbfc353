//! Per-agent performance analysis and comparison.

use serde::{Deserialize, Serialize};

use crate::job::{JobMemory, JobStatus};

/// Performance profile of one agent type across the job corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// The agent type
    pub agent_type: String,
    /// Jobs the agent participated in
    pub total_jobs: usize,
    /// Completed over finished jobs. `NaN` when the agent has no finished
    /// jobs, the documented no-data sentinel.
    pub success_rate: f32,
    /// Mean duration in minutes over the agent's finished jobs
    pub average_duration_minutes: f32,
    /// Gotchas attributed to the agent per job
    pub gotcha_rate: f32,
    /// Resolved over total gotchas attributed to the agent
    pub learning_rate: f32,
}

/// Compute the profile for one agent over the given jobs.
#[must_use]
pub(crate) fn analyze_agent(agent_type: &str, jobs: &[JobMemory]) -> AgentPerformance {
    let involved: Vec<&JobMemory> = jobs
        .iter()
        .filter(|j| j.metadata.agent_types.iter().any(|a| a == agent_type))
        .collect();

    let finished: Vec<&&JobMemory> = involved
        .iter()
        .filter(|j| j.status != JobStatus::Running)
        .collect();

    let success_rate = if finished.is_empty() {
        f32::NAN
    } else {
        finished
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count() as f32
            / finished.len() as f32
    };

    let durations: Vec<u64> = finished
        .iter()
        .filter_map(|j| j.metadata.total_duration)
        .collect();
    let average_duration_minutes = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<u64>() as f32 / durations.len() as f32
    };

    let agent_gotchas: Vec<&crate::job::Gotcha> = involved
        .iter()
        .flat_map(|j| j.gotchas.iter())
        .filter(|g| g.agent_type == agent_type)
        .collect();

    let gotcha_rate = if involved.is_empty() {
        0.0
    } else {
        agent_gotchas.len() as f32 / involved.len() as f32
    };

    let learning_rate = if agent_gotchas.is_empty() {
        0.0
    } else {
        agent_gotchas.iter().filter(|g| g.is_resolved()).count() as f32
            / agent_gotchas.len() as f32
    };

    AgentPerformance {
        agent_type: agent_type.to_string(),
        total_jobs: involved.len(),
        success_rate,
        average_duration_minutes,
        gotcha_rate,
        learning_rate,
    }
}

/// Profiles for every agent seen in the corpus, ranked by success rate
/// descending; agents without finished jobs rank last.
#[must_use]
pub(crate) fn compare_agents(jobs: &[JobMemory]) -> Vec<AgentPerformance> {
    let mut agents: Vec<String> = Vec::new();
    for job in jobs {
        for agent in &job.metadata.agent_types {
            if !agents.contains(agent) {
                agents.push(agent.clone());
            }
        }
    }

    let mut profiles: Vec<AgentPerformance> =
        agents.iter().map(|a| analyze_agent(a, jobs)).collect();
    profiles.sort_by(|a, b| {
        let a_rank = if a.success_rate.is_nan() { -1.0 } else { a.success_rate };
        let b_rank = if b.success_rate.is_nan() { -1.0 } else { b.success_rate };
        b_rank.total_cmp(&a_rank)
    });
    profiles
}
