//! Построитель ASG из S-Expression.
//!
//! Каждая специальная форма превращается в узел графа с типизированными
//! рёбрами. Всё, что не является специальной формой, становится вызовом.

use super::error::ParseError;
use super::parser::{Atom, SExpr};
use super::token::{Span, Spanned};
use super::{STACK_GROWTH, STACK_RED_ZONE};
use crate::asg::{Edge, Node, NodeID, ASG};
use crate::nodecodes::{EdgeType, NodeType};

/// Построитель ASG из S-Expression.
pub struct AsgBuilder {
    asg: ASG,
    next_id: NodeID,
}

impl Default for AsgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AsgBuilder {
    /// Создать новый построитель.
    pub fn new() -> Self {
        Self {
            asg: ASG::new(),
            next_id: 1,
        }
    }

    /// Построить ASG из списка S-выражений.
    /// Возвращает ASG и список ID корневых узлов (top-level expressions).
    pub fn build(mut self, exprs: &[SExpr]) -> Result<(ASG, Vec<NodeID>), ParseError> {
        let root_ids = exprs
            .iter()
            .map(|expr| self.build_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.asg, root_ids))
    }

    /// Построить ASG из одного S-выражения.
    pub fn build_single(mut self, expr: &SExpr) -> Result<(ASG, NodeID), ParseError> {
        let root_id = self.build_expr(expr)?;
        Ok((self.asg, root_id))
    }

    /// Выделить ID и сразу добавить узел: ID идут подряд в порядке добавления.
    fn push(
        &mut self,
        node_type: NodeType,
        payload: Option<Vec<u8>>,
        edges: Vec<Edge>,
        span: Span,
    ) -> NodeID {
        let id = self.next_id;
        self.next_id += 1;
        self.asg
            .add_node(Node::with_edges_and_span(id, node_type, payload, edges, span));
        id
    }

    fn push_named(&mut self, node_type: NodeType, name: &str, edges: Vec<Edge>, span: Span) -> NodeID {
        self.push(node_type, Some(name.as_bytes().to_vec()), edges, span)
    }

    /// Построить узел из S-выражения.
    fn build_expr(&mut self, expr: &SExpr) -> Result<NodeID, ParseError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || match expr {
            SExpr::Atom(atom) => self.build_atom(atom),
            SExpr::List(list) => self.build_list(list),
        })
    }

    /// Построить атомарный узел.
    fn build_atom(&mut self, atom: &Spanned<Atom>) -> Result<NodeID, ParseError> {
        let span = atom.span;
        let id = match &atom.value {
            Atom::Int(n) => self.push(NodeType::LiteralInt, Some(n.to_le_bytes().to_vec()), vec![], span),
            Atom::Float(f) => {
                self.push(NodeType::LiteralFloat, Some(f.to_le_bytes().to_vec()), vec![], span)
            }
            Atom::String(s) => self.push_named(NodeType::LiteralString, s, vec![], span),
            Atom::Ident(s) => match s.as_str() {
                "true" => self.push(NodeType::LiteralBool, Some(vec![1]), vec![], span),
                "false" => self.push(NodeType::LiteralBool, Some(vec![0]), vec![], span),
                "nil" => self.push(NodeType::LiteralNil, None, vec![], span),
                _ => self.push_named(NodeType::VarRef, s, vec![], span),
            },
            Atom::Symbol(s) => {
                return Err(ParseError::invalid(
                    span,
                    format!("operator '{}' outside of a list", s),
                ));
            }
        };
        Ok(id)
    }

    /// Построить узел из списка.
    fn build_list(&mut self, list: &Spanned<Vec<SExpr>>) -> Result<NodeID, ParseError> {
        let elements = list.value.as_slice();
        let span = list.span;

        // () == nil
        let Some(first) = elements.first() else {
            return Ok(self.push(NodeType::LiteralNil, None, vec![], span));
        };

        let Some(form_name) = first.as_ident().or_else(|| first.as_symbol()) else {
            // ((lambda (x) x) 1)
            return self.build_call(elements, span);
        };

        match form_name {
            // Арифметика (variadic + и *)
            "+" => self.build_variadic(elements, NodeType::Add, span),
            "*" => self.build_variadic(elements, NodeType::Mul, span),
            "-" => match elements.len() {
                2 => self.build_unop(elements, NodeType::Neg, span),
                3 => self.build_binop(elements, NodeType::Sub, span),
                n => Err(ParseError::wrong_arity(span, "-", "1 or 2", n - 1)),
            },
            "/" => self.build_binop(elements, NodeType::Div, span),
            "%" => self.build_binop(elements, NodeType::Mod, span),

            // Сравнение
            "==" => self.build_binop(elements, NodeType::Eq, span),
            "!=" => self.build_binop(elements, NodeType::Ne, span),
            "<" => self.build_binop(elements, NodeType::Lt, span),
            "<=" => self.build_binop(elements, NodeType::Le, span),
            ">" => self.build_binop(elements, NodeType::Gt, span),
            ">=" => self.build_binop(elements, NodeType::Ge, span),

            // Логика
            "and" => self.build_binop(elements, NodeType::And, span),
            "or" => self.build_binop(elements, NodeType::Or, span),
            "not" | "!" => self.build_unop(elements, NodeType::Not, span),

            // Переменные
            "let" => self.build_let(elements, span),
            "set" => self.build_set(elements, span),

            // Управление
            "if" => self.build_if(elements, span),
            "do" => self.build_do(elements, span),
            "while" => self.build_while(elements, span),
            "times" => self.build_times(elements, span),

            // Функции
            "fn" => self.build_fn(elements, span),
            "lambda" => self.build_lambda(elements, span),

            // Массивы
            "array" => self.build_array(elements, span),
            "index" => self.build_index(elements, span),
            "length" => self.build_unop(elements, NodeType::ArrayLength, span),

            // Встроенные
            "print" => self.build_print(elements, span),
            "sleep" => self.build_unop(elements, NodeType::Sleep, span),
            "throw" => self.build_unop(elements, NodeType::Throw, span),
            "is-error" => self.build_unop(elements, NodeType::IsError, span),
            "is-nil" => self.build_unop(elements, NodeType::IsNil, span),

            // Потоки
            "thread" | "thread-spawn" => self.build_thread_spawn(elements, span),
            "thread-join" => self.build_unop(elements, NodeType::ThreadJoin, span),
            "thread-state" => self.build_unop(elements, NodeType::ThreadState, span),
            "thread-id" => self.build_unop(elements, NodeType::ThreadId, span),

            // Всё остальное: вызов функции
            _ => self.build_call(elements, span),
        }
    }

    /// Построить variadic операцию: (+ a b c) = (+ (+ a b) c).
    fn build_variadic(
        &mut self,
        elements: &[SExpr],
        node_type: NodeType,
        span: Span,
    ) -> Result<NodeID, ParseError> {
        if elements.len() < 3 {
            return Err(ParseError::wrong_arity(
                span,
                format!("{:?}", node_type),
                "at least 2",
                elements.len() - 1,
            ));
        }

        let mut result = self.build_expr(&elements[1])?;
        for elem in &elements[2..] {
            let right = self.build_expr(elem)?;
            result = self.push(
                node_type,
                None,
                vec![
                    Edge::new(EdgeType::FirstOperand, result),
                    Edge::new(EdgeType::SecondOperand, right),
                ],
                span,
            );
        }
        Ok(result)
    }

    /// Построить бинарную операцию.
    fn build_binop(
        &mut self,
        elements: &[SExpr],
        node_type: NodeType,
        span: Span,
    ) -> Result<NodeID, ParseError> {
        if elements.len() != 3 {
            return Err(ParseError::wrong_arity(
                span,
                format!("{:?}", node_type),
                "2",
                elements.len() - 1,
            ));
        }

        let left_id = self.build_expr(&elements[1])?;
        let right_id = self.build_expr(&elements[2])?;
        Ok(self.push(
            node_type,
            None,
            vec![
                Edge::new(EdgeType::FirstOperand, left_id),
                Edge::new(EdgeType::SecondOperand, right_id),
            ],
            span,
        ))
    }

    /// Построить унарную операцию.
    fn build_unop(
        &mut self,
        elements: &[SExpr],
        node_type: NodeType,
        span: Span,
    ) -> Result<NodeID, ParseError> {
        if elements.len() != 2 {
            return Err(ParseError::wrong_arity(
                span,
                format!("{:?}", node_type),
                "1",
                elements.len() - 1,
            ));
        }

        let operand_id = self.build_expr(&elements[1])?;
        Ok(self.push(
            node_type,
            None,
            vec![Edge::new(EdgeType::ApplicationArgument, operand_id)],
            span,
        ))
    }

    /// Тело из нескольких выражений: пусто → nil, одно → само выражение, иначе Block.
    fn build_body(&mut self, body: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        match body {
            [] => Ok(self.push(NodeType::LiteralNil, None, vec![], span)),
            [single] => self.build_expr(single),
            _ => {
                let mut edges = Vec::with_capacity(body.len());
                for expr in body {
                    edges.push(Edge::new(EdgeType::BlockStatement, self.build_expr(expr)?));
                }
                Ok(self.push(NodeType::Block, None, edges, span))
            }
        }
    }

    fn expect_ident<'e>(expr: &'e SExpr, what: &str) -> Result<&'e str, ParseError> {
        expr.as_ident()
            .ok_or_else(|| ParseError::invalid(expr.span(), format!("expected identifier for {}", what)))
    }

    /// Построить let: (let name value).
    fn build_let(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() != 3 {
            return Err(ParseError::wrong_arity(span, "let", "2", elements.len() - 1));
        }

        let name = Self::expect_ident(&elements[1], "variable name")?;
        let value_id = self.build_expr(&elements[2])?;
        Ok(self.push_named(
            NodeType::Variable,
            name,
            vec![Edge::new(EdgeType::VarValue, value_id)],
            span,
        ))
    }

    /// Построить set (присваивание): (set name value).
    fn build_set(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() != 3 {
            return Err(ParseError::wrong_arity(span, "set", "2", elements.len() - 1));
        }

        let name = Self::expect_ident(&elements[1], "variable name")?;
        let target_id = self.push_named(NodeType::VarRef, name, vec![], elements[1].span());
        let value_id = self.build_expr(&elements[2])?;
        Ok(self.push(
            NodeType::Assign,
            None,
            vec![
                Edge::new(EdgeType::AssignTarget, target_id),
                Edge::new(EdgeType::AssignValue, value_id),
            ],
            span,
        ))
    }

    /// Построить if.
    fn build_if(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 3 || elements.len() > 4 {
            return Err(ParseError::wrong_arity(span, "if", "2 or 3", elements.len() - 1));
        }

        let cond_id = self.build_expr(&elements[1])?;
        let then_id = self.build_expr(&elements[2])?;
        let mut edges = vec![
            Edge::new(EdgeType::Condition, cond_id),
            Edge::new(EdgeType::ThenBranch, then_id),
        ];
        if let Some(else_expr) = elements.get(3) {
            edges.push(Edge::new(EdgeType::ElseBranch, self.build_expr(else_expr)?));
        }

        Ok(self.push(NodeType::If, None, edges, span))
    }

    /// Построить do (последовательность выражений).
    fn build_do(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 2 {
            return Err(ParseError::wrong_arity(span, "do", "1+", 0));
        }
        self.build_body(&elements[1..], span)
    }

    /// Построить while: (while cond body...).
    fn build_while(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 2 {
            return Err(ParseError::wrong_arity(span, "while", "1+", 0));
        }

        let cond_id = self.build_expr(&elements[1])?;
        let body_id = self.build_body(&elements[2..], span)?;
        Ok(self.push(
            NodeType::Loop,
            None,
            vec![
                Edge::new(EdgeType::Condition, cond_id),
                Edge::new(EdgeType::LoopBody, body_id),
            ],
            span,
        ))
    }

    /// Построить times: (times n body...).
    fn build_times(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 2 {
            return Err(ParseError::wrong_arity(span, "times", "1+", 0));
        }

        let count_id = self.build_expr(&elements[1])?;
        let body_id = self.build_body(&elements[2..], span)?;
        Ok(self.push(
            NodeType::Times,
            None,
            vec![
                Edge::new(EdgeType::LoopCount, count_id),
                Edge::new(EdgeType::LoopBody, body_id),
            ],
            span,
        ))
    }

    /// Параметры и тело: общая часть fn и lambda.
    fn build_params_and_body(
        &mut self,
        params: &SExpr,
        body: &[SExpr],
        span: Span,
    ) -> Result<Vec<Edge>, ParseError> {
        let params_list = params
            .as_list()
            .ok_or_else(|| ParseError::invalid(params.span(), "expected parameter list"))?;

        let mut edges = Vec::with_capacity(params_list.len() + 1);
        for param_expr in params_list {
            let param_name = Self::expect_ident(param_expr, "parameter name")?;
            let param_id = self.push_named(NodeType::Parameter, param_name, vec![], param_expr.span());
            edges.push(Edge::new(EdgeType::FunctionParameter, param_id));
        }

        let body_id = self.build_body(body, span)?;
        edges.push(Edge::new(EdgeType::FunctionBody, body_id));
        Ok(edges)
    }

    /// Построить fn: (fn name (params...) body...).
    fn build_fn(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 3 {
            return Err(ParseError::wrong_arity(span, "fn", "2+", elements.len() - 1));
        }

        let name = Self::expect_ident(&elements[1], "function name")?;
        let edges = self.build_params_and_body(&elements[2], &elements[3..], span)?;
        Ok(self.push_named(NodeType::Function, name, edges, span))
    }

    /// Построить lambda: (lambda (params...) body...).
    fn build_lambda(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() < 2 {
            return Err(ParseError::wrong_arity(span, "lambda", "1+", 0));
        }

        let edges = self.build_params_and_body(&elements[1], &elements[2..], span)?;
        Ok(self.push(NodeType::Lambda, None, edges, span))
    }

    /// Построить вызов функции: (f arg1 arg2 ...).
    fn build_call(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        let target_id = self.build_expr(&elements[0])?;
        let mut edges = vec![Edge::new(EdgeType::CallTarget, target_id)];
        for arg_expr in &elements[1..] {
            edges.push(Edge::new(EdgeType::CallArgument, self.build_expr(arg_expr)?));
        }
        Ok(self.push(NodeType::Call, None, edges, span))
    }

    /// Построить array.
    fn build_array(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        let mut edges = Vec::with_capacity(elements.len() - 1);
        for elem_expr in &elements[1..] {
            edges.push(Edge::new(EdgeType::ArrayElement, self.build_expr(elem_expr)?));
        }
        Ok(self.push(NodeType::Array, None, edges, span))
    }

    /// Построить index: (index arr i).
    fn build_index(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        if elements.len() != 3 {
            return Err(ParseError::wrong_arity(span, "index", "2", elements.len() - 1));
        }

        let array_id = self.build_expr(&elements[1])?;
        let index_id = self.build_expr(&elements[2])?;
        Ok(self.push(
            NodeType::ArrayIndex,
            None,
            vec![
                Edge::new(EdgeType::FirstOperand, array_id),
                Edge::new(EdgeType::ArrayIndexExpr, index_id),
            ],
            span,
        ))
    }

    /// Построить print: (print a b ...).
    fn build_print(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        let mut edges = Vec::with_capacity(elements.len() - 1);
        for arg in &elements[1..] {
            edges.push(Edge::new(EdgeType::ApplicationArgument, self.build_expr(arg)?));
        }
        Ok(self.push(NodeType::Print, None, edges, span))
    }

    /// Построить запуск потока: (thread f a1 ... an).
    ///
    /// Без вызываемого значения `(thread)` получает nil и падает при
    /// выполнении с ошибкой захвата, а не при разборе.
    fn build_thread_spawn(&mut self, elements: &[SExpr], span: Span) -> Result<NodeID, ParseError> {
        let callable_id = match elements.get(1) {
            Some(callable) => self.build_expr(callable)?,
            None => self.push(NodeType::LiteralNil, None, vec![], span),
        };

        let mut edges = vec![Edge::new(EdgeType::ThreadCallable, callable_id)];
        for arg in elements.iter().skip(2) {
            edges.push(Edge::new(EdgeType::ThreadArgument, self.build_expr(arg)?));
        }
        Ok(self.push(NodeType::ThreadSpawn, None, edges, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::Parser;

    fn build(src: &str) -> (ASG, Vec<NodeID>) {
        let exprs = Parser::new(src).parse_all().unwrap();
        AsgBuilder::new().build(&exprs).unwrap()
    }

    fn root<'a>(asg: &'a ASG, roots: &[NodeID]) -> &'a Node {
        asg.find_node(*roots.last().unwrap()).unwrap()
    }

    #[test]
    fn test_ids_are_sequential() {
        let (asg, _) = build("(let x (+ 1 2 3)) (thread (lambda (a) (* a 2)) x)");
        for (idx, node) in asg.nodes.iter().enumerate() {
            assert_eq!(node.id, idx as NodeID + 1);
        }
    }

    #[test]
    fn test_thread_spawn_edges() {
        let (asg, roots) = build("(thread (lambda (a b) a) 1 2)");
        let node = root(&asg, &roots);
        assert_eq!(node.node_type, NodeType::ThreadSpawn);
        let callable = node.find_edge(EdgeType::ThreadCallable).unwrap();
        assert_eq!(
            asg.find_node(callable.target_node_id).unwrap().node_type,
            NodeType::Lambda
        );
        assert_eq!(node.targets(EdgeType::ThreadArgument).len(), 2);
    }

    #[test]
    fn test_thread_without_callable_gets_nil() {
        let (asg, roots) = build("(thread)");
        let node = root(&asg, &roots);
        let callable = node.find_edge(EdgeType::ThreadCallable).unwrap();
        assert_eq!(
            asg.find_node(callable.target_node_id).unwrap().node_type,
            NodeType::LiteralNil
        );
    }

    #[test]
    fn test_lambda_bodies() {
        let (asg, roots) = build("(lambda ()) (lambda (x) (set x 1) x)");
        let empty = asg.find_node(roots[0]).unwrap();
        let body = empty.find_edge(EdgeType::FunctionBody).unwrap().target_node_id;
        assert_eq!(asg.find_node(body).unwrap().node_type, NodeType::LiteralNil);

        let multi = asg.find_node(roots[1]).unwrap();
        assert_eq!(multi.targets(EdgeType::FunctionParameter).len(), 1);
        let body = multi.find_edge(EdgeType::FunctionBody).unwrap().target_node_id;
        let block = asg.find_node(body).unwrap();
        assert_eq!(block.node_type, NodeType::Block);
        assert_eq!(block.targets(EdgeType::BlockStatement).len(), 2);
    }

    #[test]
    fn test_times_edges() {
        let (asg, roots) = build("(times 10 (set a (+ a 1)))");
        let node = root(&asg, &roots);
        assert_eq!(node.node_type, NodeType::Times);
        assert!(node.find_edge(EdgeType::LoopCount).is_some());
        assert!(node.find_edge(EdgeType::LoopBody).is_some());
    }

    #[test]
    fn test_variadic_add_chains() {
        let (asg, roots) = build("(+ 1 2 3)");
        let node = root(&asg, &roots);
        assert_eq!(node.node_type, NodeType::Add);
        let left = node.find_edge(EdgeType::FirstOperand).unwrap().target_node_id;
        assert_eq!(asg.find_node(left).unwrap().node_type, NodeType::Add);
    }

    #[test]
    fn test_wrong_arity() {
        let exprs = Parser::new("(let x)").parse_all().unwrap();
        let err = AsgBuilder::new().build(&exprs).unwrap_err();
        assert!(matches!(err, ParseError::WrongArity { ref name, got: 1, .. } if name == "let"));
    }

    #[test]
    fn test_bare_symbol_rejected() {
        let exprs = Parser::new("+").parse_all().unwrap();
        assert!(matches!(
            AsgBuilder::new().build(&exprs),
            Err(ParseError::InvalidSyntax { .. })
        ));
    }
}
