/// 勾配場の合成方針
///
/// 各近傍エッジについて、右辺ベクトルへ注入する勾配値を決定します。
/// すべての比較と注入はチャンネルごとに独立して行われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientPolicy {
    /// ソース画像の勾配をそのまま取り込む（通常のシームレスクローン）
    #[default]
    Import,
    /// ソース側とターゲット側のうち、絶対値が大きい方の勾配を採用する
    MixMax,
}

/// One channel of one neighbor edge `p -> q`.
///
/// `target` holds the target samples at the offset-mapped `p` and `q`, or
/// `None` when either mapped coordinate falls outside the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSample {
    /// ソース画像の `(p, q)` の値
    pub source: (f64, f64),
    /// ターゲット画像の `(p, q)` の値（どちらかが範囲外なら `None`）
    pub target: Option<(f64, f64)>,
}

impl GradientPolicy {
    /// Gradient injected into the right-hand side for a single edge and channel.
    #[must_use]
    pub fn edge_gradient(self, edge: EdgeSample) -> f64 {
        let (src_p, src_q) = edge.source;
        let source_gradient = src_p - src_q;

        match self {
            Self::Import => source_gradient,
            Self::MixMax => match edge.target {
                Some((tar_p, tar_q)) if (tar_p - tar_q).abs() > source_gradient.abs() => {
                    tar_p - tar_q
                }
                _ => source_gradient,
            },
        }
    }
}
