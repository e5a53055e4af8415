//! Local explanation templates, used whenever the hosted model is
//! unconfigured or unavailable.

use crate::explain::ExplainInput;

pub fn render_fallback(input: &ExplainInput) -> String {
    if input.recommendations.is_empty() {
        return format!(
            "{} 투자자님의 조건에 맞는 추천 종목을 찾지 못했습니다. 조건을 넓혀 다시 시도해 보세요.",
            input.profile.archetype
        );
    }

    let mut out = format!(
        "{} 유형(레벨 {}) 투자자님께 추천하는 상품입니다.\n",
        input.profile.archetype, input.profile.level
    );
    for rec in &input.recommendations {
        out.push_str(&format!(
            "{}. {} — {}\n",
            rec.rank,
            rec.name,
            reason_line(rec.risk_tier, rec.breakdown.cost, rec.breakdown.ret)
        ));
    }
    out.push_str("위 추천은 보유하신 투자 성향과 위험 등급 기준으로 선별되었습니다.");
    out
}

fn reason_line(risk_tier: u8, cost: f64, ret: f64) -> &'static str {
    if risk_tier <= 2 {
        "변동성이 낮아 안정적인 운용에 적합합니다."
    } else if cost >= 0.9 {
        "보수율이 낮아 장기 보유 비용 부담이 적습니다."
    } else if ret >= 0.7 {
        "최근 수익률 흐름이 상위권입니다."
    } else {
        "투자 성향 가중치 기준 종합 점수가 높습니다."
    }
}
