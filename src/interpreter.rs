//! Простой, рекурсивный интерпретатор ASG.
//!
//! Каждый узел вычисляется заново при каждом посещении; локальные
//! переменные живут во фреймах вызова, остальные в глобальной таблице.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::asg::{Node, NodeID, ASG};
use crate::config::RuntimeConfig;
use crate::error::{SpindleError, SpindleResult};
use crate::nodecodes::{EdgeType, NodeType};
use crate::parser::parse;
use crate::thread::{capture, ThreadHandle};
use crate::value::{Closure, Value};

/// Фрейм вызова: параметры, захваченные переменные и локальные `let`.
#[derive(Debug, Clone, Default)]
struct CallFrame {
    locals: HashMap<String, Value>,
}

/// Состояние интерпретатора.
pub struct Interpreter {
    /// Глобальные переменные
    variables: HashMap<String, Value>,
    /// Именованные функции из `fn`
    functions: HashMap<String, Closure>,
    /// Стек вызовов
    call_stack: Vec<CallFrame>,
    config: Arc<RuntimeConfig>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_shared_config(Arc::new(RuntimeConfig::default()))
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    /// Интерпретатор с общей конфигурацией (контексты потоков делят её с родителем).
    pub fn with_shared_config(config: Arc<RuntimeConfig>) -> Self {
        Self {
            variables: HashMap::new(),
            functions: HashMap::new(),
            call_stack: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn get_variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn get_functions(&self) -> &HashMap<String, Closure> {
        &self.functions
    }

    pub(crate) fn install_functions(&mut self, functions: HashMap<String, Closure>) {
        self.functions.extend(functions);
    }

    /// Выполняет ASG начиная с корневого узла.
    pub fn execute(&mut self, asg: &Arc<ASG>, root_id: NodeID) -> SpindleResult<Value> {
        self.eval(asg, root_id)
    }

    /// Разобрать и выполнить исходник; возвращает значение последнего выражения.
    pub fn eval_source(&mut self, source: &str) -> SpindleResult<Value> {
        let (asg, root_ids) = parse(source)?;
        let mut result = Value::Nil;
        for root_id in root_ids {
            result = self.execute(&asg, root_id)?;
        }
        Ok(result)
    }

    /// Вызвать замыкание с точным числом аргументов.
    pub(crate) fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> SpindleResult<Value> {
        if args.len() != closure.arity() {
            return Err(SpindleError::InvalidOperation(format!(
                "wrong number of arguments for {} (given {}, expected {})",
                closure.name.as_deref().unwrap_or("lambda"),
                args.len(),
                closure.arity()
            )));
        }

        let mut frame = CallFrame {
            locals: closure.captured.clone(),
        };
        for (param, arg) in closure.params.iter().zip(args) {
            frame.locals.insert(param.clone(), arg);
        }

        self.call_stack.push(frame);
        let result = self.eval(&closure.program, closure.body_id);
        self.call_stack.pop();
        result
    }

    // === Переменные ===

    /// Сначала фрейм текущего вызова, затем глобальные переменные.
    fn resolve_variable(&self, name: &str) -> Option<&Value> {
        self.call_stack
            .last()
            .and_then(|frame| frame.locals.get(name))
            .or_else(|| self.variables.get(name))
    }

    fn declare(&mut self, name: String, value: Value) {
        match self.call_stack.last_mut() {
            Some(frame) => frame.locals.insert(name, value),
            None => self.variables.insert(name, value),
        };
    }

    fn assign(&mut self, name: &str, value: Value) -> SpindleResult<()> {
        if let Some(slot) = self
            .call_stack
            .last_mut()
            .and_then(|frame| frame.locals.get_mut(name))
        {
            *slot = value;
            return Ok(());
        }
        match self.variables.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(SpindleError::UnknownVariable(name.to_string())),
        }
    }

    /// Переменные, видимые в текущем фрейме (для замыканий).
    fn visible_locals(&self) -> HashMap<String, Value> {
        self.call_stack
            .last()
            .map(|frame| frame.locals.clone())
            .unwrap_or_default()
    }

    // === Вычисление ===

    /// Вычислить узел. Использует stacker для расширения стека при глубокой рекурсии.
    fn eval(&mut self, asg: &Arc<ASG>, node_id: NodeID) -> SpindleResult<Value> {
        let red_zone = self.config.stack_red_zone;
        let growth = self.config.stack_growth;
        stacker::maybe_grow(red_zone, growth, || {
            let node = asg
                .find_node(node_id)
                .ok_or(SpindleError::NodeNotFound(node_id))?;
            self.eval_node(asg, node)
        })
    }

    fn eval_edge(&mut self, asg: &Arc<ASG>, node: &Node, edge_type: EdgeType) -> SpindleResult<Value> {
        let target = edge_target(node, edge_type)?;
        self.eval(asg, target)
    }

    fn eval_edges(&mut self, asg: &Arc<ASG>, node: &Node, edge_type: EdgeType) -> SpindleResult<Vec<Value>> {
        node.targets(edge_type)
            .into_iter()
            .map(|id| self.eval(asg, id))
            .collect()
    }

    fn eval_node(&mut self, asg: &Arc<ASG>, node: &Node) -> SpindleResult<Value> {
        let value = match node.node_type {
            // === Литералы ===
            NodeType::LiteralInt => Value::Int(i64::from_le_bytes(payload_8(node)?)),
            NodeType::LiteralFloat => Value::Float(f64::from_le_bytes(payload_8(node)?)),
            NodeType::LiteralBool => {
                let byte = node
                    .payload
                    .as_ref()
                    .and_then(|p| p.first())
                    .ok_or(SpindleError::MissingPayload(node.id))?;
                Value::Bool(*byte != 0)
            }
            NodeType::LiteralString => Value::String(name_of(node)?),
            NodeType::LiteralNil => Value::Nil,

            // === Арифметика ===
            NodeType::Add
            | NodeType::Sub
            | NodeType::Mul
            | NodeType::Div
            | NodeType::Mod => {
                let left = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                let right = self.eval_edge(asg, node, EdgeType::SecondOperand)?;
                arithmetic(node.node_type, left, right)?
            }
            NodeType::Neg => match self.eval_edge(asg, node, EdgeType::ApplicationArgument)? {
                Value::Int(n) => Value::Int(n.checked_neg().ok_or_else(overflow)?),
                Value::Float(f) => Value::Float(-f),
                other => return Err(type_error("neg", &other)),
            },

            // === Сравнение ===
            NodeType::Eq | NodeType::Ne => {
                let left = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                let right = self.eval_edge(asg, node, EdgeType::SecondOperand)?;
                let equal = values_equal(&left, &right);
                Value::Bool(if node.node_type == NodeType::Eq { equal } else { !equal })
            }
            NodeType::Lt | NodeType::Le | NodeType::Gt | NodeType::Ge => {
                let left = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                let right = self.eval_edge(asg, node, EdgeType::SecondOperand)?;
                compare(node.node_type, &left, &right)?
            }

            // === Логика (с коротким замыканием) ===
            NodeType::And => {
                let left = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                if left.is_truthy() {
                    self.eval_edge(asg, node, EdgeType::SecondOperand)?
                } else {
                    left
                }
            }
            NodeType::Or => {
                let left = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                if left.is_truthy() {
                    left
                } else {
                    self.eval_edge(asg, node, EdgeType::SecondOperand)?
                }
            }
            NodeType::Not => {
                Value::Bool(!self.eval_edge(asg, node, EdgeType::ApplicationArgument)?.is_truthy())
            }

            // === Управление ===
            NodeType::If => {
                if self.eval_edge(asg, node, EdgeType::Condition)?.is_truthy() {
                    self.eval_edge(asg, node, EdgeType::ThenBranch)?
                } else if node.find_edge(EdgeType::ElseBranch).is_some() {
                    self.eval_edge(asg, node, EdgeType::ElseBranch)?
                } else {
                    Value::Nil
                }
            }
            NodeType::Block => {
                let mut last = Value::Nil;
                for id in node.targets(EdgeType::BlockStatement) {
                    last = self.eval(asg, id)?;
                }
                last
            }
            NodeType::Loop => {
                let cond_id = edge_target(node, EdgeType::Condition)?;
                let body_id = edge_target(node, EdgeType::LoopBody)?;
                let mut last = Value::Nil;
                while self.eval(asg, cond_id)?.is_truthy() {
                    last = self.eval(asg, body_id)?;
                }
                last
            }
            NodeType::Times => {
                let count = match self.eval_edge(asg, node, EdgeType::LoopCount)? {
                    Value::Int(n) => n,
                    other => return Err(type_error("times", &other)),
                };
                let body_id = edge_target(node, EdgeType::LoopBody)?;
                for _ in 0..count.max(0) {
                    self.eval(asg, body_id)?;
                }
                Value::Int(count)
            }

            // === Функции ===
            NodeType::Function => {
                let name = name_of(node)?;
                let mut closure = self.make_closure(asg, node)?;
                closure.name = Some(name.clone());
                log::trace!("defining function {}", name);
                self.functions.insert(name, closure.clone());
                Value::Function(closure)
            }
            NodeType::Lambda => Value::Function(self.make_closure(asg, node)?),
            NodeType::Call => {
                let callee = self.eval_call_target(asg, edge_target(node, EdgeType::CallTarget)?)?;
                let args = self.eval_edges(asg, node, EdgeType::CallArgument)?;
                match callee {
                    Value::Function(closure) => self.invoke(&closure, args)?,
                    other => {
                        return Err(SpindleError::TypeError(format!(
                            "{} is not callable",
                            other.type_name()
                        )))
                    }
                }
            }

            // === Переменные ===
            NodeType::Variable => {
                let value = self.eval_edge(asg, node, EdgeType::VarValue)?;
                self.declare(name_of(node)?, value.clone());
                value
            }
            NodeType::VarRef => {
                let name = name_of(node)?;
                match self.resolve_variable(&name) {
                    Some(value) => value.clone(),
                    None => match self.functions.get(&name) {
                        Some(closure) => Value::Function(closure.clone()),
                        None => return Err(SpindleError::UnknownVariable(name)),
                    },
                }
            }
            NodeType::Assign => {
                let target_id = edge_target(node, EdgeType::AssignTarget)?;
                let target = asg
                    .find_node(target_id)
                    .ok_or(SpindleError::NodeNotFound(target_id))?;
                let name = name_of(target)?;
                let value = self.eval_edge(asg, node, EdgeType::AssignValue)?;
                self.assign(&name, value.clone())?;
                value
            }

            // === Массивы ===
            NodeType::Array => Value::Array(self.eval_edges(asg, node, EdgeType::ArrayElement)?),
            NodeType::ArrayIndex => {
                let array = self.eval_edge(asg, node, EdgeType::FirstOperand)?;
                let index = self.eval_edge(asg, node, EdgeType::ArrayIndexExpr)?;
                match (array, index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let len = items.len() as i64;
                        let i = if i < 0 { len + i } else { i };
                        usize::try_from(i)
                            .ok()
                            .and_then(|i| items.into_iter().nth(i))
                            .unwrap_or(Value::Nil)
                    }
                    (Value::Array(_), other) => return Err(type_error("index", &other)),
                    (other, _) => return Err(type_error("index", &other)),
                }
            }
            NodeType::ArrayLength => match self.eval_edge(asg, node, EdgeType::ApplicationArgument)? {
                Value::Array(items) => Value::Int(items.len() as i64),
                Value::String(s) => Value::Int(s.chars().count() as i64),
                other => return Err(type_error("length", &other)),
            },

            // === Встроенные ===
            NodeType::Print => {
                let values = self.eval_edges(asg, node, EdgeType::ApplicationArgument)?;
                let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                println!("{}", line.join(" "));
                Value::Nil
            }
            NodeType::Sleep => {
                let duration = match self.eval_edge(asg, node, EdgeType::ApplicationArgument)? {
                    Value::Int(ms) if ms >= 0 => Duration::from_millis(ms as u64),
                    Value::Float(ms) if ms >= 0.0 => Duration::try_from_secs_f64(ms / 1000.0)
                        .map_err(|_| SpindleError::InvalidOperation(format!("sleep duration out of range: {}", ms)))?,
                    other => return Err(type_error("sleep", &other)),
                };
                std::thread::sleep(duration);
                Value::Nil
            }
            NodeType::Throw => {
                let message = self.eval_edge(asg, node, EdgeType::ApplicationArgument)?;
                return Err(SpindleError::Thrown(message.to_string()));
            }
            NodeType::IsError => {
                Value::Bool(self.eval_edge(asg, node, EdgeType::ApplicationArgument)?.is_error())
            }
            NodeType::IsNil => {
                Value::Bool(self.eval_edge(asg, node, EdgeType::ApplicationArgument)?.is_nil())
            }

            // === Потоки ===
            NodeType::ThreadSpawn => {
                let callable = self.eval_edge(asg, node, EdgeType::ThreadCallable)?;
                let args = self.eval_edges(asg, node, EdgeType::ThreadArgument)?;
                let unit = capture(&callable, args)?.with_functions(self.functions.clone());
                Value::Thread(ThreadHandle::spawn(unit, Arc::clone(&self.config))?)
            }
            NodeType::ThreadJoin => self.eval_thread(asg, node, "thread-join")?.join(),
            NodeType::ThreadState => {
                Value::String(self.eval_thread(asg, node, "thread-state")?.state().name().to_string())
            }
            NodeType::ThreadId => Value::Int(self.eval_thread(asg, node, "thread-id")?.id() as i64),

            NodeType::Parameter => {
                return Err(SpindleError::InvalidOperation(format!(
                    "parameter node {} cannot be evaluated",
                    node.id
                )))
            }
        };
        Ok(value)
    }

    /// Цель вызова: имя функции ищется среди переменных и функций.
    fn eval_call_target(&mut self, asg: &Arc<ASG>, target_id: NodeID) -> SpindleResult<Value> {
        let target = asg
            .find_node(target_id)
            .ok_or(SpindleError::NodeNotFound(target_id))?;
        if target.node_type == NodeType::VarRef {
            let name = name_of(target)?;
            if let Some(value) = self.resolve_variable(&name) {
                return Ok(value.clone());
            }
            return self
                .functions
                .get(&name)
                .map(|closure| Value::Function(closure.clone()))
                .ok_or(SpindleError::UnknownFunction(name));
        }
        self.eval(asg, target_id)
    }

    fn make_closure(&self, asg: &Arc<ASG>, node: &Node) -> SpindleResult<Closure> {
        let params = node
            .targets(EdgeType::FunctionParameter)
            .into_iter()
            .map(|id| {
                asg.find_node(id)
                    .ok_or(SpindleError::NodeNotFound(id))
                    .and_then(name_of)
            })
            .collect::<SpindleResult<Vec<_>>>()?;
        let body_id = edge_target(node, EdgeType::FunctionBody)?;

        let mut closure = Closure::new(None, params, body_id, Arc::clone(asg));
        closure.captured = self.visible_locals();
        Ok(closure)
    }

    fn eval_thread(&mut self, asg: &Arc<ASG>, node: &Node, op: &str) -> SpindleResult<ThreadHandle> {
        match self.eval_edge(asg, node, EdgeType::ApplicationArgument)? {
            Value::Thread(handle) => Ok(handle),
            other => Err(type_error(op, &other)),
        }
    }
}

// === Вспомогательные функции ===

fn edge_target(node: &Node, edge_type: EdgeType) -> SpindleResult<NodeID> {
    node.find_edge(edge_type)
        .map(|e| e.target_node_id)
        .ok_or(SpindleError::MissingEdge(node.id, edge_type))
}

fn name_of(node: &Node) -> SpindleResult<String> {
    match &node.payload {
        None => Err(SpindleError::MissingPayload(node.id)),
        Some(_) => node.get_name().ok_or(SpindleError::InvalidPayload(node.id)),
    }
}

fn payload_8(node: &Node) -> SpindleResult<[u8; 8]> {
    let payload = node
        .payload
        .as_ref()
        .ok_or(SpindleError::MissingPayload(node.id))?;
    payload
        .get(..8)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(SpindleError::InvalidPayload(node.id))
}

fn type_error(op: &str, value: &Value) -> SpindleError {
    SpindleError::TypeError(format!("{} does not accept {}", op, value.type_name()))
}

fn overflow() -> SpindleError {
    SpindleError::InvalidOperation("integer overflow".to_string())
}

fn arithmetic(op: NodeType, left: Value, right: Value) -> SpindleResult<Value> {
    let result = match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let checked = match op {
                NodeType::Add => a.checked_add(b),
                NodeType::Sub => a.checked_sub(b),
                NodeType::Mul => a.checked_mul(b),
                NodeType::Div | NodeType::Mod if b == 0 => {
                    return Err(SpindleError::InvalidOperation("division by zero".to_string()))
                }
                NodeType::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            Value::Int(checked.ok_or_else(overflow)?)
        }
        (Value::Float(a), Value::Float(b)) => Value::Float(float_op(op, a, b)),
        (Value::Int(a), Value::Float(b)) => Value::Float(float_op(op, a as f64, b)),
        (Value::Float(a), Value::Int(b)) => Value::Float(float_op(op, a, b as f64)),
        (Value::String(a), Value::String(b)) if op == NodeType::Add => Value::String(a + &b),
        (Value::Array(mut a), Value::Array(b)) if op == NodeType::Add => {
            a.extend(b);
            Value::Array(a)
        }
        (left, right) => {
            return Err(SpindleError::TypeError(format!(
                "{:?} does not accept {} and {}",
                op,
                left.type_name(),
                right.type_name()
            )))
        }
    };
    Ok(result)
}

fn float_op(op: NodeType, a: f64, b: f64) -> f64 {
    match op {
        NodeType::Add => a + b,
        NodeType::Sub => a - b,
        NodeType::Mul => a * b,
        NodeType::Div => a / b,
        _ => a % b,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => left == right,
    }
}

fn compare(op: NodeType, left: &Value, right: &Value) -> SpindleResult<Value> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(SpindleError::TypeError(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            )))
        }
    };

    let result = match ordering {
        // NaN
        None => false,
        Some(ord) => match op {
            NodeType::Lt => ord == Ordering::Less,
            NodeType::Le => ord != Ordering::Greater,
            NodeType::Gt => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        },
    };
    Ok(Value::Bool(result))
}
